use std::path::PathBuf;

/// Status code the library returns on success.
pub const SUCCESS: i32 = 0;

/// Raw function catalogue as handed out by the library.
///
/// `names` is newline separated; `arities` and `returns` run parallel to
/// it. A negative `count` means the catalogue could not be produced and
/// the three tables are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionTable {
    pub count: i32,
    pub names: Vec<u8>,
    pub arities: Vec<i8>,
    pub returns: Vec<bool>,
}

/// Raw command catalogue: newline separated names and argument descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    pub count: i32,
    pub names: Vec<u8>,
    pub descriptions: Vec<u8>,
}

/// A value popped off the operand stack, still in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoppedValue {
    pub tag: i32,
    pub data: Vec<u8>,
}

/// Fixed tokens used to recognise peer sockets during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketTokens {
    /// Directory under which every peer creates its socket directory.
    pub sock_dir: PathBuf,
    /// File name suffix of a peer's listening socket.
    pub server_suffix: String,
    /// File name of the socket a connected client creates.
    pub client_suffix: String,
    /// File holding the peer's window title.
    pub title_file: String,
}

/// The C calling surface of the shared transport library.
///
/// Every method maps onto exactly one exported entry point. Implementations
/// do no locking; callers serialize stack traffic themselves.
pub trait XeprLibrary: Send + Sync {
    /// `XeprAPIactive`: non-negative when the peer has the API enabled.
    fn api_active(&self) -> i32;

    /// `XeprDisableAPI`: `release == true` asks the peer to drop the client.
    fn disable_api(&self, release: bool) -> i32;

    /// `XeprSetInstPID`: bind the library to one peer process.
    fn set_instance_pid(&self, pid: u32);

    /// `XeprGetFunctions`.
    fn functions(&self) -> FunctionTable;

    /// `XeprGetXeprCommands`.
    fn commands(&self) -> CommandTable;

    /// `XeprGetProDeLDir`: root of the peer's scripting documentation.
    fn prodel_dir(&self) -> Option<PathBuf>;

    /// `XeprCallFunction`: zero on success.
    fn call_function(&self, ordinal: usize) -> i32;

    /// `XeprPushValue`.
    fn push_value(&self, tag: i32, data: &[u8]);

    /// `XeprPopValue`.
    fn pop_value(&self) -> PoppedValue;

    /// `XeprGetMutable`: fill `buf` with the next pending out-buffer.
    fn get_mutable(&self, buf: &mut [u8]);

    /// `XeprRefreshGUI`.
    fn refresh_gui(&self);

    /// `XeprGetSockDir` plus the `suffserv`/`suffclient`/`sufftitle` symbols.
    fn socket_tokens(&self) -> SocketTokens;
}
