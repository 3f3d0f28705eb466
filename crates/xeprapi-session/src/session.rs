use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use xeprapi_catalog::{
    parse_commands, parse_functions, scan_prototypes, Arity, Member, MemberRegistry,
};
use xeprapi_codec::{Handle, StackValue, XeprBuf};
use xeprapi_transport::{
    choose_instance, find_instances, Instance, InstanceSelector, XeprLibrary, SUCCESS,
};

use crate::config::{pid_from_env, SessionConfig};
use crate::error::{Result, XeprError};
use crate::lock::TransportLock;

/// Members the session defines itself. A catalogue entry with one of these
/// names is reachable only under its `_<name>_` alias.
pub const RESERVED_MEMBERS: &[&str] = &[
    "getTitle",
    "aqGetStrParValue",
    "aqGetSplFormula",
    "aqGetParUnits",
    "aqGetParLabel",
    "aqGetSplName",
    "aqGetComment",
    "XeprOpen",
    "XeprClose",
    "XeprActive",
    "XeprGUIrefresh",
    "XeprDataset",
    "XeprExperiment",
    "XeprCmds",
];

/// Reserved members that return text through an appended out-buffer.
pub const TEXT_MEMBERS: &[&str] = &[
    "getTitle",
    "aqGetStrParValue",
    "aqGetSplFormula",
    "aqGetParUnits",
    "aqGetParLabel",
    "aqGetSplName",
    "aqGetComment",
];

const TEXT_BUFFER_LEN: usize = 1024;

/// Catalogue function every command is dispatched through.
pub const COMMAND_DISPATCH: &str = "execCmd";

/// A connection to one peer process.
///
/// Dropping the session tells the peer the client is gone.
pub struct Session {
    library: Arc<dyn XeprLibrary>,
    pub(crate) lock: TransportLock,
    members: RwLock<Option<Arc<MemberRegistry>>>,
    pid: u32,
    config: SessionConfig,
}

impl Session {
    /// Load the native library, find the peer, and open the API.
    #[cfg(unix)]
    pub fn connect(config: SessionConfig) -> Result<Self> {
        Self::connect_inner(config, None)
    }

    /// Like [`Session::connect`], consulting `selector` when several peers are reachable.
    #[cfg(unix)]
    pub fn connect_with_selector(
        config: SessionConfig,
        selector: &dyn InstanceSelector,
    ) -> Result<Self> {
        Self::connect_inner(config, Some(selector))
    }

    #[cfg(unix)]
    fn connect_inner(config: SessionConfig, selector: Option<&dyn InstanceSelector>) -> Result<Self> {
        let library = xeprapi_transport::NativeLibrary::open(config.library_dir.as_deref())?;
        Self::with_library(Arc::new(library), config, selector)
    }

    /// Open a session over an already loaded library.
    ///
    /// `XEPR_PID` binds directly to that peer; otherwise discovery runs.
    pub fn with_library(
        library: Arc<dyn XeprLibrary>,
        config: SessionConfig,
        selector: Option<&dyn InstanceSelector>,
    ) -> Result<Self> {
        if let Some(pid) = pid_from_env()? {
            debug!(pid, "peer selected through environment");
            return Self::bind(library, pid, config);
        }
        let available = find_instances(library.as_ref())?;
        Self::with_instances(library, config, selector, &available)
    }

    /// Open a session choosing among `available` peers.
    pub fn with_instances(
        library: Arc<dyn XeprLibrary>,
        config: SessionConfig,
        selector: Option<&dyn InstanceSelector>,
        available: &[Instance],
    ) -> Result<Self> {
        let pid = choose_instance(available, config.pid, selector, config.ambiguity)?;
        Self::bind(library, pid, config)
    }

    /// Bind to `pid` without discovery and open the API.
    pub fn bind(library: Arc<dyn XeprLibrary>, pid: u32, config: SessionConfig) -> Result<Self> {
        library.set_instance_pid(pid);
        let session = Self {
            library,
            lock: TransportLock::new(),
            members: RwLock::new(None),
            pid,
            config,
        };
        session.open()?;
        Ok(session)
    }

    /// Fetch the catalogues and synthesize the member table.
    ///
    /// Re-opening after [`Session::close`] runs full discovery again.
    pub fn open(&self) -> Result<()> {
        let _guard = self.lock.acquire();
        self.lifecycle("opening Xepr API");
        if self.library.api_active() < SUCCESS {
            return Err(XeprError::ApiInactive);
        }

        let functions = parse_functions(&self.library.functions())?;
        let commands = parse_commands(&self.library.commands())?;
        let docs = self
            .library
            .prodel_dir()
            .map(|dir| scan_prototypes(&dir))
            .unwrap_or_default();

        let registry = MemberRegistry::build(
            functions,
            commands,
            &docs,
            RESERVED_MEMBERS,
            self.config.catalog_config(),
            |entry| {
                self.invoke_entry(entry, &mut [], None)?
                    .ok_or_else(|| XeprError::NoReturnValue(entry.name.clone()))
            },
        )?;

        debug!(
            members = registry.len(),
            commands = registry.commands().len(),
            "catalogue synthesized"
        );
        *self.members.write() = Some(Arc::new(registry));
        self.lifecycle("Xepr API open");
        Ok(())
    }

    /// Revoke all members and ask the peer to release this client.
    pub fn close(&self) -> Result<()> {
        let _guard = self.lock.acquire();
        self.members.write().take();
        self.lifecycle("closing Xepr API");
        let status = self.library.disable_api(true);
        if status != SUCCESS {
            return Err(XeprError::CloseRejected(status));
        }
        Ok(())
    }

    /// True when the peer reports the API as enabled.
    pub fn active(&self) -> bool {
        let _guard = self.lock.acquire();
        self.library.api_active() >= SUCCESS
    }

    pub fn is_open(&self) -> bool {
        self.members.read().is_some()
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn library(&self) -> &dyn XeprLibrary {
        self.library.as_ref()
    }

    /// The member table of the open session.
    pub fn registry(&self) -> Result<Arc<MemberRegistry>> {
        self.members.read().clone().ok_or(XeprError::NotOpen)
    }

    /// The member bound under `name`.
    pub fn member(&self, name: &str) -> Result<Member> {
        self.registry()?
            .get(name)
            .cloned()
            .ok_or_else(|| XeprError::NoSuchMember(name.to_string()))
    }

    /// Documentation of the member bound under `name`.
    pub fn doc(&self, name: &str) -> Result<String> {
        Ok(self.member(name)?.doc)
    }

    /// Invoke the member bound under `name`.
    ///
    /// Out-buffers among `args` are refreshed in place. Folded constants
    /// answer from their cached value without touching the peer.
    pub fn invoke(&self, name: &str, args: &mut [StackValue]) -> Result<Option<StackValue>> {
        let member = self.member(name)?;
        if let Some(value) = member.constant {
            if !args.is_empty() {
                return Err(XeprError::Arity {
                    name: name.to_string(),
                    expected: 0,
                    got: args.len(),
                });
            }
            return Ok(Some(value));
        }

        match member.entry.arity {
            Arity::Fixed(expected) if expected != args.len() => Err(XeprError::Arity {
                name: name.to_string(),
                expected,
                got: args.len(),
            }),
            Arity::Fixed(_) => self.invoke_entry(&member.entry, args, None),
            Arity::Variadic => {
                let count = StackValue::from(args.len());
                self.invoke_entry(&member.entry, args, Some(count))
            }
        }
    }

    /// Invoke with owned arguments.
    pub fn call(&self, name: &str, mut args: Vec<StackValue>) -> Result<Option<StackValue>> {
        self.invoke(name, &mut args)
    }

    /// Invoke a member that must return a value.
    pub fn call_value(&self, name: &str, args: Vec<StackValue>) -> Result<StackValue> {
        self.call(name, args)?
            .ok_or_else(|| XeprError::NoReturnValue(name.to_string()))
    }

    pub fn call_handle(&self, name: &str, args: Vec<StackValue>) -> Result<Handle> {
        let value = self.call_value(name, args)?;
        value.as_handle().ok_or_else(|| unexpected(name, "pointer", &value))
    }

    pub fn call_i64(&self, name: &str, args: Vec<StackValue>) -> Result<i64> {
        let value = self.call_value(name, args)?;
        value.as_i64().ok_or_else(|| unexpected(name, "integer", &value))
    }

    pub fn call_f64(&self, name: &str, args: Vec<StackValue>) -> Result<f64> {
        let value = self.call_value(name, args)?;
        value.as_f64().ok_or_else(|| unexpected(name, "number", &value))
    }

    pub fn call_bool(&self, name: &str, args: Vec<StackValue>) -> Result<bool> {
        let value = self.call_value(name, args)?;
        value.as_bool().ok_or_else(|| unexpected(name, "bool", &value))
    }

    /// Value of a zero-argument returning member, usually a folded constant.
    pub fn constant(&self, name: &str) -> Result<StackValue> {
        self.call_value(name, Vec::new())
    }

    /// The peer's `NIL` handle, or the null handle if it has none.
    pub fn nil(&self) -> Handle {
        self.constant("NIL")
            .ok()
            .and_then(|v| v.as_handle())
            .unwrap_or(Handle::NULL)
    }

    /// Call a reserved text member (`getTitle`, `aqGetParUnits`, ...).
    ///
    /// A 1024-byte out-buffer (and, except for `getTitle`, its length) is
    /// appended to `args`; the buffer's text is returned.
    pub fn call_text(&self, name: &str, mut args: Vec<StackValue>) -> Result<String> {
        if !TEXT_MEMBERS.contains(&name) {
            return Err(XeprError::NoSuchMember(name.to_string()));
        }
        let slot = args.len();
        args.push(StackValue::Buffer(XeprBuf::new(TEXT_BUFFER_LEN)));
        if name != "getTitle" {
            args.push(StackValue::from(TEXT_BUFFER_LEN));
        }
        self.invoke(&format!("_{name}_"), &mut args)?;
        Ok(args[slot].as_buffer().map(XeprBuf::text).unwrap_or_default())
    }

    /// Title of a dataset.
    pub fn title(&self, dset: Handle) -> Result<String> {
        self.call_text("getTitle", vec![dset.into()])
    }

    /// Run a peer command through the dispatch function.
    pub fn exec_cmd(&self, name: &str, args: &[StackValue]) -> Result<()> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(StackValue::from(name));
        full.extend_from_slice(args);
        self.invoke(COMMAND_DISPATCH, &mut full)?;
        Ok(())
    }

    /// Ask the peer to redraw its GUI.
    pub fn gui_refresh(&self) {
        let _guard = self.lock.acquire();
        self.library.refresh_gui();
    }

    fn lifecycle(&self, message: &str) {
        if self.config.verbose {
            info!(pid = self.pid, "{message}");
        } else {
            debug!(pid = self.pid, "{message}");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.library.disable_api(false);
        debug!(pid = self.pid, "session dropped");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.pid)
            .field("open", &self.is_open())
            .field("config", &self.config)
            .finish()
    }
}

fn unexpected(name: &str, expected: &'static str, value: &StackValue) -> XeprError {
    XeprError::UnexpectedReturn {
        name: name.to_string(),
        expected,
        got: value.stack_type(),
    }
}
