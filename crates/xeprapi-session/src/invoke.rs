//! Function invocation engine.
//!
//! One call is one uninterrupted stack sequence under the session lock:
//! ```text
//! push arg0 .. argN [count]   -> XeprPushValue per argument
//! call ordinal                -> XeprCallFunction, nonzero status fails
//! drain out-buffers, reversed -> XeprGetMutable per buffer argument
//! pop return value            -> XeprPopValue, only if the entry returns
//! ```

use tracing::trace;
use xeprapi_catalog::FunctionEntry;
use xeprapi_codec::{decode, encode, StackValue};
use xeprapi_transport::SUCCESS;

use crate::error::{Result, XeprError};
use crate::session::Session;

impl Session {
    /// Run one catalogue entry with `args` plus an optional hidden trailer.
    ///
    /// Every argument is encoded before the first push, so an encoding
    /// failure never leaves a partial push on the stack.
    pub(crate) fn invoke_entry(
        &self,
        entry: &FunctionEntry,
        args: &mut [StackValue],
        trailer: Option<StackValue>,
    ) -> Result<Option<StackValue>> {
        let _guard = self.lock.acquire();
        let library = self.library();

        let encoded = args
            .iter()
            .chain(trailer.iter())
            .map(encode)
            .collect::<xeprapi_codec::Result<Vec<_>>>()?;

        for (tag, bytes) in &encoded {
            trace!(function = %entry.name, %tag, len = bytes.len(), "push");
            library.push_value(tag.ordinal(), bytes);
        }

        let status = library.call_function(entry.ordinal);
        if status != SUCCESS {
            return Err(XeprError::Call {
                name: entry.name.clone(),
                status,
            });
        }

        for arg in args.iter_mut().rev() {
            if let Some(buf) = arg.as_buffer_mut() {
                let mut contents = vec![0u8; buf.raw_len()];
                library.get_mutable(&mut contents);
                buf.overwrite(&contents);
            }
        }

        if !entry.returns {
            return Ok(None);
        }
        let popped = library.pop_value();
        let value = decode(popped.tag, &popped.data)?;
        trace!(function = %entry.name, tag = popped.tag, "pop");
        Ok(Some(value))
    }
}
