use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::ptr;

use libc::{c_char, c_int, c_void};
use libloading::{Library, Symbol};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::library::{CommandTable, FunctionTable, PoppedValue, SocketTokens, XeprLibrary};

/// Environment variable naming the directory that holds the library.
pub const LIB_DIR_ENV: &str = "XEPRAPI_LIB_DIR";

/// Size of the scratch areas the library writes C strings and popped values into.
const SCRATCH_LEN: usize = 255;

type ApiActiveFn = unsafe extern "C" fn() -> c_int;
type DisableApiFn = unsafe extern "C" fn(c_int) -> c_int;
type SetInstPidFn = unsafe extern "C" fn(c_int) -> c_int;
type GetFunctionsFn =
    unsafe extern "C" fn(*mut *const c_char, *mut *const c_char, *mut *const c_char) -> c_int;
type GetCommandsFn = unsafe extern "C" fn(*mut *const c_char, *mut *const c_char) -> c_int;
type GetProDeLDirFn = unsafe extern "C" fn(*mut *const c_char) -> c_int;
type CallFunctionFn = unsafe extern "C" fn(c_int) -> c_int;
type PushValueFn = unsafe extern "C" fn(c_int, *const c_void, c_int) -> c_int;
type PopValueFn = unsafe extern "C" fn(*mut c_int, *mut c_char) -> c_int;
type GetMutableFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_int;
type RefreshGuiFn = unsafe extern "C" fn() -> c_int;
type GetSockDirFn = unsafe extern "C" fn(*mut c_char) -> c_int;

struct Symbols {
    api_active: ApiActiveFn,
    disable_api: DisableApiFn,
    set_inst_pid: SetInstPidFn,
    get_functions: GetFunctionsFn,
    get_commands: GetCommandsFn,
    get_prodel_dir: GetProDeLDirFn,
    call_function: CallFunctionFn,
    push_value: PushValueFn,
    pop_value: PopValueFn,
    get_mutable: GetMutableFn,
    refresh_gui: RefreshGuiFn,
    get_sock_dir: GetSockDirFn,
}

/// File name of the transport library for the current pointer width.
pub fn library_file_name() -> &'static str {
    if cfg!(target_pointer_width = "32") {
        "libxeprapi_32.so"
    } else {
        "libxeprapi.so"
    }
}

/// Locate the transport library.
///
/// Directory precedence: `dir`, then `XEPRAPI_LIB_DIR`, then the directory of
/// the running executable, then the current directory.
pub fn resolve_library_path(dir: Option<&Path>) -> PathBuf {
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LIB_DIR_ENV).map(PathBuf::from))
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        })
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(library_file_name())
}

/// The transport library loaded through the platform dynamic loader.
///
/// Each instance loads its own private copy of the library file, so two
/// instances in one process never share library state.
pub struct NativeLibrary {
    symbols: Symbols,
    server_suffix: String,
    client_suffix: String,
    title_file: String,
    path: PathBuf,
    // Keeps the mapping behind `symbols` alive; dropped last.
    _library: Library,
}

impl NativeLibrary {
    /// Load the library found by [`resolve_library_path`].
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        Self::load(&resolve_library_path(dir))
    }

    /// Stage a private copy of `path` and load it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(TransportError::LibraryNotFound {
                path: path.to_path_buf(),
            });
        }

        let stage_err = |source| TransportError::Stage {
            path: path.to_path_buf(),
            source,
        };
        let staged = tempfile::Builder::new()
            .prefix("lib")
            .suffix(".so")
            .tempfile()
            .map_err(stage_err)?;
        std::fs::copy(path, staged.path()).map_err(stage_err)?;
        debug!(source = ?path, staged = ?staged.path(), "staged transport library");

        // SAFETY: loading runs the library's initialisers. The library is
        // the vendor transport, which has no load-time side effects beyond
        // its own static state.
        let library = unsafe { Library::new(staged.path()) }.map_err(|source| {
            TransportError::Load {
                path: path.to_path_buf(),
                source,
            }
        })?;
        // The mapping outlives the file; unlink the staged copy right away.
        drop(staged);

        // SAFETY: every signature below matches the exported C prototype.
        let symbols = unsafe {
            Symbols {
                api_active: function(&library, "XeprAPIactive")?,
                disable_api: function(&library, "XeprDisableAPI")?,
                set_inst_pid: function(&library, "XeprSetInstPID")?,
                get_functions: function(&library, "XeprGetFunctions")?,
                get_commands: function(&library, "XeprGetXeprCommands")?,
                get_prodel_dir: function(&library, "XeprGetProDeLDir")?,
                call_function: function(&library, "XeprCallFunction")?,
                push_value: function(&library, "XeprPushValue")?,
                pop_value: function(&library, "XeprPopValue")?,
                get_mutable: function(&library, "XeprGetMutable")?,
                refresh_gui: function(&library, "XeprRefreshGUI")?,
                get_sock_dir: function(&library, "XeprGetSockDir")?,
            }
        };

        // SAFETY: the three tokens are null-terminated char arrays exported
        // as data symbols; they live as long as `library`.
        let (server_suffix, client_suffix, title_file) = unsafe {
            (
                data_string(&library, "suffserv")?,
                data_string(&library, "suffclient")?,
                data_string(&library, "sufftitle")?,
            )
        };

        info!(?path, "loaded transport library");
        Ok(Self {
            symbols,
            server_suffix,
            client_suffix,
            title_file,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Path of the library file this instance was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

unsafe fn function<T: Copy>(library: &Library, symbol: &'static str) -> Result<T> {
    let sym: Symbol<T> = library
        .get(symbol.as_bytes())
        .map_err(|source| TransportError::MissingSymbol { symbol, source })?;
    Ok(*sym)
}

unsafe fn data_string(library: &Library, symbol: &'static str) -> Result<String> {
    let sym: Symbol<*const c_char> = library
        .get(symbol.as_bytes())
        .map_err(|source| TransportError::MissingSymbol { symbol, source })?;
    Ok(String::from_utf8_lossy(&c_bytes(*sym)).into_owned())
}

/// Copy a C string, treating a null pointer as empty.
unsafe fn c_bytes(ptr: *const c_char) -> Vec<u8> {
    if ptr.is_null() {
        return Vec::new();
    }
    CStr::from_ptr(ptr).to_bytes().to_vec()
}

/// Copy `len` bytes from a library-owned table, treating null as empty.
unsafe fn table<T: Copy>(ptr: *const c_char, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(ptr.cast::<T>(), len).to_vec()
}

fn c_len(len: usize) -> c_int {
    c_int::try_from(len).unwrap_or(c_int::MAX)
}

impl XeprLibrary for NativeLibrary {
    fn api_active(&self) -> i32 {
        // SAFETY: no arguments.
        unsafe { (self.symbols.api_active)() }
    }

    fn disable_api(&self, release: bool) -> i32 {
        // SAFETY: plain integer argument.
        unsafe { (self.symbols.disable_api)(c_int::from(release)) }
    }

    fn set_instance_pid(&self, pid: u32) {
        // SAFETY: plain integer argument.
        unsafe {
            (self.symbols.set_inst_pid)(c_len(pid as usize));
        }
    }

    fn functions(&self) -> FunctionTable {
        let mut names = ptr::null();
        let mut arities = ptr::null();
        let mut returns = ptr::null();
        // SAFETY: the library stores pointers to its own tables in the three
        // out-parameters; the tables hold `count` entries each.
        unsafe {
            let count = (self.symbols.get_functions)(&mut names, &mut arities, &mut returns);
            let Ok(len) = usize::try_from(count) else {
                return FunctionTable {
                    count,
                    ..FunctionTable::default()
                };
            };
            FunctionTable {
                count,
                names: c_bytes(names),
                arities: table::<i8>(arities, len),
                returns: table::<u8>(returns, len)
                    .into_iter()
                    .map(|b| b != 0)
                    .collect(),
            }
        }
    }

    fn commands(&self) -> CommandTable {
        let mut names = ptr::null();
        let mut descriptions = ptr::null();
        // SAFETY: the library stores pointers to two C strings it owns.
        unsafe {
            let count = (self.symbols.get_commands)(&mut names, &mut descriptions);
            if count < 0 {
                return CommandTable {
                    count,
                    ..CommandTable::default()
                };
            }
            CommandTable {
                count,
                names: c_bytes(names),
                descriptions: c_bytes(descriptions),
            }
        }
    }

    fn prodel_dir(&self) -> Option<PathBuf> {
        let mut dir = ptr::null();
        // SAFETY: the library stores a pointer to a C string it owns.
        let bytes = unsafe {
            (self.symbols.get_prodel_dir)(&mut dir);
            c_bytes(dir)
        };
        if bytes.is_empty() {
            return None;
        }
        Some(PathBuf::from(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn call_function(&self, ordinal: usize) -> i32 {
        let Ok(ordinal) = c_int::try_from(ordinal) else {
            return -1;
        };
        // SAFETY: plain integer argument.
        unsafe { (self.symbols.call_function)(ordinal) }
    }

    fn push_value(&self, tag: i32, data: &[u8]) {
        // SAFETY: the library copies `data.len()` bytes before returning.
        unsafe {
            (self.symbols.push_value)(tag, data.as_ptr().cast(), c_len(data.len()));
        }
    }

    fn pop_value(&self) -> PoppedValue {
        let mut tag: c_int = 0;
        let mut data = vec![0u8; SCRATCH_LEN];
        // SAFETY: `data` is the fixed-size scratch area the library writes into.
        unsafe {
            (self.symbols.pop_value)(&mut tag, data.as_mut_ptr().cast());
        }
        PoppedValue { tag, data }
    }

    fn get_mutable(&self, buf: &mut [u8]) {
        // SAFETY: the library writes at most `buf.len()` bytes.
        unsafe {
            (self.symbols.get_mutable)(buf.as_mut_ptr().cast(), c_len(buf.len()));
        }
    }

    fn refresh_gui(&self) {
        // SAFETY: no arguments.
        unsafe {
            (self.symbols.refresh_gui)();
        }
    }

    fn socket_tokens(&self) -> SocketTokens {
        let mut buf = vec![0u8; SCRATCH_LEN];
        // SAFETY: the library writes a C string of at most SCRATCH_LEN bytes.
        let dir = unsafe {
            (self.symbols.get_sock_dir)(buf.as_mut_ptr().cast());
            c_bytes(buf.as_ptr().cast())
        };
        SocketTokens {
            sock_dir: PathBuf::from(String::from_utf8_lossy(&dir).into_owned()),
            server_suffix: self.server_suffix.clone(),
            client_suffix: self.client_suffix.clone(),
            title_file: self.title_file.clone(),
        }
    }
}
