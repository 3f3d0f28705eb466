//! Scripted in-memory stand-in for the transport library.
//!
//! Functions are registered with a handler that receives the decoded
//! arguments of each call. Buffer arguments may be modified in place; the
//! fake hands their contents back through `get_mutable` in reverse push
//! order, like the real library.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use xeprapi_codec::{decode, encode, Handle, StackValue, XeprBuf, POP_BUFFER_LEN};
use xeprapi_transport::{
    CommandTable, FunctionTable, Instance, PoppedValue, SocketTokens, XeprLibrary,
};

use crate::config::SessionConfig;
use crate::session::Session;

pub(crate) type Reply = std::result::Result<Option<StackValue>, i32>;
type Handler = Box<dyn FnMut(&mut [StackValue]) -> Reply + Send>;

struct FakeFunction {
    name: String,
    arity: i8,
    returns: bool,
    handler: Handler,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CallRecord {
    pub name: String,
    pub args: Vec<StackValue>,
}

struct FakeState {
    functions: Vec<FakeFunction>,
    commands: Vec<(String, String)>,
    function_count: Option<i32>,
    command_count: Option<i32>,
    stack: Vec<StackValue>,
    mutables: Vec<Vec<u8>>,
    popped: Option<PoppedValue>,
    calls: Vec<CallRecord>,
    api_active: i32,
    disable_status: i32,
    disabled: Vec<bool>,
    pid: Option<u32>,
    prodel_dir: Option<PathBuf>,
    refreshes: usize,
}

pub(crate) struct FakeLibrary {
    state: Mutex<FakeState>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                functions: Vec::new(),
                commands: Vec::new(),
                function_count: None,
                command_count: None,
                stack: Vec::new(),
                mutables: Vec::new(),
                popped: None,
                calls: Vec::new(),
                api_active: 0,
                disable_status: 0,
                disabled: Vec::new(),
                pid: None,
                prodel_dir: None,
                refreshes: 0,
            }),
        }
    }

    /// Register a function; negative `arity` is variadic.
    pub fn function(
        self,
        name: &str,
        arity: i8,
        returns: bool,
        handler: impl FnMut(&mut [StackValue]) -> Reply + Send + 'static,
    ) -> Self {
        self.state.lock().functions.push(FakeFunction {
            name: name.to_string(),
            arity,
            returns,
            handler: Box::new(handler),
        });
        self
    }

    pub fn constant(self, name: &str, value: impl Into<StackValue>) -> Self {
        let value = value.into();
        self.function(name, 0, true, move |_| Ok(Some(value.clone())))
    }

    pub fn command(self, name: &str, description: &str) -> Self {
        self.state
            .lock()
            .commands
            .push((name.to_string(), description.to_string()));
        self
    }

    pub fn with_prodel_dir(self, dir: PathBuf) -> Self {
        self.state.lock().prodel_dir = Some(dir);
        self
    }

    pub fn set_function_count(&self, count: i32) {
        self.state.lock().function_count = Some(count);
    }

    pub fn set_command_count(&self, count: i32) {
        self.state.lock().command_count = Some(count);
    }

    pub fn set_api_active(&self, status: i32) {
        self.state.lock().api_active = status;
    }

    pub fn set_disable_status(&self, status: i32) {
        self.state.lock().disable_status = status;
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().calls.clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.state.lock().calls.iter().map(|c| c.name.clone()).collect()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.name == name)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn disabled(&self) -> Vec<bool> {
        self.state.lock().disabled.clone()
    }

    pub fn bound_pid(&self) -> Option<u32> {
        self.state.lock().pid
    }

    pub fn refreshes(&self) -> usize {
        self.state.lock().refreshes
    }

    pub fn stack_depth(&self) -> usize {
        self.state.lock().stack.len()
    }
}

impl XeprLibrary for FakeLibrary {
    fn api_active(&self) -> i32 {
        self.state.lock().api_active
    }

    fn disable_api(&self, release: bool) -> i32 {
        let mut state = self.state.lock();
        state.disabled.push(release);
        state.disable_status
    }

    fn set_instance_pid(&self, pid: u32) {
        self.state.lock().pid = Some(pid);
    }

    fn functions(&self) -> FunctionTable {
        let state = self.state.lock();
        let count = state
            .function_count
            .unwrap_or(state.functions.len() as i32);
        if count < 0 {
            return FunctionTable {
                count,
                ..FunctionTable::default()
            };
        }
        let names: Vec<&str> = state.functions.iter().map(|f| f.name.as_str()).collect();
        FunctionTable {
            count,
            names: names.join("\n").into_bytes(),
            arities: state.functions.iter().map(|f| f.arity).collect(),
            returns: state.functions.iter().map(|f| f.returns).collect(),
        }
    }

    fn commands(&self) -> CommandTable {
        let state = self.state.lock();
        let count = state.command_count.unwrap_or(state.commands.len() as i32);
        let names: Vec<&str> = state.commands.iter().map(|c| c.0.as_str()).collect();
        let descriptions: Vec<&str> = state.commands.iter().map(|c| c.1.as_str()).collect();
        CommandTable {
            count,
            names: names.join("\n").into_bytes(),
            descriptions: descriptions.join("\n").into_bytes(),
        }
    }

    fn prodel_dir(&self) -> Option<PathBuf> {
        self.state.lock().prodel_dir.clone()
    }

    fn call_function(&self, ordinal: usize) -> i32 {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut args = std::mem::take(&mut state.stack);
        let Some(function) = state.functions.get_mut(ordinal) else {
            return -1;
        };
        state.calls.push(CallRecord {
            name: function.name.clone(),
            args: args.clone(),
        });

        let returns = function.returns;
        let reply = match (function.handler)(&mut args) {
            Ok(reply) => reply,
            Err(status) => return status,
        };

        state.mutables = args
            .iter()
            .filter_map(|arg| arg.as_buffer().map(|buf| buf.as_raw().to_vec()))
            .collect();

        state.popped = match (returns, reply) {
            (true, Some(value)) => {
                let (tag, bytes) = encode(&value).expect("fake reply must be encodable");
                let mut data = bytes.to_vec();
                data.resize(data.len().max(POP_BUFFER_LEN), 0);
                Some(PoppedValue {
                    tag: tag.ordinal(),
                    data,
                })
            }
            _ => None,
        };
        0
    }

    fn push_value(&self, tag: i32, data: &[u8]) {
        let value = decode(tag, data).expect("pushed value must decode");
        self.state.lock().stack.push(value);
    }

    fn pop_value(&self) -> PoppedValue {
        self.state.lock().popped.take().unwrap_or(PoppedValue {
            tag: 0,
            data: vec![0; POP_BUFFER_LEN],
        })
    }

    fn get_mutable(&self, buf: &mut [u8]) {
        if let Some(contents) = self.state.lock().mutables.pop() {
            let n = contents.len().min(buf.len());
            buf[..n].copy_from_slice(&contents[..n]);
        }
    }

    fn refresh_gui(&self) {
        self.state.lock().refreshes += 1;
    }

    fn socket_tokens(&self) -> SocketTokens {
        SocketTokens {
            sock_dir: PathBuf::from("/nonexistent/xepr"),
            server_suffix: "serv".to_string(),
            client_suffix: "client".to_string(),
            title_file: "title".to_string(),
        }
    }
}

/// Open a session bound to PID 4711 over `fake`.
pub(crate) fn open(fake: &Arc<FakeLibrary>) -> Session {
    open_with(fake, SessionConfig::default())
}

pub(crate) fn open_with(fake: &Arc<FakeLibrary>, config: SessionConfig) -> Session {
    Session::bind(fake.clone(), 4711, config).expect("fake session should open")
}

pub(crate) fn instance(pid: u32) -> Instance {
    Instance {
        pid,
        title: format!("Xepr {pid}"),
    }
}

pub(crate) fn int(value: &StackValue) -> i32 {
    value.as_i64().expect("integer argument") as i32
}

pub(crate) fn float(value: &StackValue) -> f64 {
    value.as_f64().expect("numeric argument")
}

pub(crate) fn text(value: &StackValue) -> String {
    value.as_str().expect("string argument").to_string()
}

pub(crate) fn write_text(value: &mut StackValue, text: &str) {
    value
        .as_buffer_mut()
        .expect("buffer argument")
        .set_text(text)
        .expect("latin-1 text");
}

// Constants of the simulated peer.
pub(crate) const X_ABSC: i32 = 10;
pub(crate) const Y_ABSC: i32 = 11;
pub(crate) const REAL_ORD: i32 = 12;
pub(crate) const IMAG_ORD: i32 = 13;

pub(crate) const AQ_DT_UNKNOWN: i32 = 0;
pub(crate) const AQ_DT_BOOLEAN: i32 = 1;
pub(crate) const AQ_DT_ENUM: i32 = 2;
pub(crate) const AQ_DT_STRING: i32 = 3;
pub(crate) const AQ_DT_REAL: i32 = 4;

pub(crate) const AQ_EXP_ACTIVE: i32 = 1;
pub(crate) const AQ_EXP_EDIT: i32 = 2;
pub(crate) const AQ_EXP_PAUSED: i32 = 3;
pub(crate) const AQ_EXP_CLOSED: i32 = 4;
pub(crate) const AQ_EXP_INSTALLED: i32 = 5;
pub(crate) const AQ_EXP_RUNNING: i32 = 6;

/// A dataset held by the simulated peer.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FakeDset {
    pub complex: bool,
    /// Row-major: `[x]` or `[y, x]`.
    pub dims: Vec<usize>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
    pub title: String,
}

impl FakeDset {
    pub fn new(complex: bool, dims: Vec<usize>) -> Self {
        let points: usize = dims.iter().product();
        let xn = dims.last().copied().unwrap_or(0);
        let yn = if dims.len() == 2 { dims[0] } else { 0 };
        Self {
            complex,
            x: vec![0.0; xn],
            y: vec![0.0; yn],
            real: vec![0.0; points],
            imag: vec![0.0; points],
            dims,
            title: String::new(),
        }
    }

    fn xn(&self) -> usize {
        self.dims.last().copied().unwrap_or(0)
    }

    fn axis_mut(&mut self, axis: i32) -> &mut Vec<f64> {
        match axis {
            X_ABSC => &mut self.x,
            Y_ABSC => &mut self.y,
            REAL_ORD => &mut self.real,
            _ => &mut self.imag,
        }
    }
}

/// Dataset state of the simulated peer.
#[derive(Debug, Default)]
pub(crate) struct DsetWorld {
    pub dsets: HashMap<i32, FakeDset>,
    pub slots: HashMap<String, FakeDset>,
    failing: HashMap<String, usize>,
    next: i32,
}

impl DsetWorld {
    /// Make the next call of `name` report status -1.
    pub fn fail_next(&mut self, name: &str) {
        *self.failing.entry(name.to_string()).or_default() += 1;
    }

    fn take_failure(&mut self, name: &str) -> bool {
        match self.failing.get_mut(name) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    fn insert(&mut self, dset: FakeDset) -> StackValue {
        self.next += 1;
        let handle = 0x100 + self.next;
        self.dsets.insert(handle, dset);
        StackValue::Pointer(Handle(handle))
    }
}

fn handle_of(value: &StackValue) -> i32 {
    value.as_handle().expect("pointer argument").raw()
}

const SLOTS: [&str; 4] = ["Primary", "Secondary", "Result", "Qualifier"];

/// Register the dataset surface of the peer, backed by `world`.
pub(crate) fn with_datasets(fake: FakeLibrary, world: &Arc<Mutex<DsetWorld>>) -> FakeLibrary {
    let mut fake = fake
        .constant("NIL", Handle::NULL)
        .constant("X_ABSC", X_ABSC)
        .constant("Y_ABSC", Y_ABSC)
        .constant("REAL_ORD", REAL_ORD)
        .constant("IMAG_ORD", IMAG_ORD);

    let w = world.clone();
    fake = fake.function("createDset", 2, true, move |args| {
        let complex = args[0].as_bool().unwrap_or(false);
        let n = int(&args[1]) as usize;
        Ok(Some(w.lock().insert(FakeDset::new(complex, vec![n]))))
    });
    let w = world.clone();
    fake = fake.function("create2DDset", 3, true, move |args| {
        let complex = args[0].as_bool().unwrap_or(false);
        let (x, y) = (int(&args[1]) as usize, int(&args[2]) as usize);
        Ok(Some(w.lock().insert(FakeDset::new(complex, vec![y, x]))))
    });

    for slot in SLOTS {
        let w = world.clone();
        fake = fake.function(&format!("getCopyOf{slot}"), 0, true, move |_| {
            let mut world = w.lock();
            if world.take_failure(&format!("getCopyOf{slot}")) {
                return Err(-1);
            }
            match world.slots.get(slot).cloned() {
                Some(dset) => Ok(Some(world.insert(dset))),
                None => Ok(Some(StackValue::Pointer(Handle::NULL))),
            }
        });
        let w = world.clone();
        fake = fake.function(&format!("copyDsetTo{slot}"), 1, false, move |args| {
            let mut world = w.lock();
            let dset = world.dsets[&handle_of(&args[0])].clone();
            world.slots.insert(slot.to_string(), dset);
            Ok(None)
        });
    }

    let w = world.clone();
    fake = fake.function("destroyDset", 1, false, move |args| {
        w.lock().dsets.remove(&handle_of(&args[0]));
        Ok(None)
    });
    let w = world.clone();
    fake = fake.function("isComplex", 1, true, move |args| {
        Ok(Some(w.lock().dsets[&handle_of(&args[0])].complex.into()))
    });
    let w = world.clone();
    fake = fake.function("getDimension", 1, true, move |args| {
        Ok(Some(StackValue::from(
            w.lock().dsets[&handle_of(&args[0])].dims.len(),
        )))
    });
    let w = world.clone();
    fake = fake.function("getNrOfPoints", 2, true, move |args| {
        let world = w.lock();
        let dset = &world.dsets[&handle_of(&args[0])];
        let n = match int(&args[1]) {
            Y_ABSC => dset.dims[0],
            _ => dset.xn(),
        };
        Ok(Some(StackValue::from(n)))
    });
    let w = world.clone();
    fake = fake.function("getValue", 3, true, move |args| {
        let mut world = w.lock();
        let dset = world.dsets.get_mut(&handle_of(&args[0])).expect("live dataset");
        let idx = int(&args[1]) as usize;
        Ok(Some(StackValue::Double(dset.axis_mut(int(&args[2]))[idx])))
    });
    let w = world.clone();
    fake = fake.function("setValue", 4, false, move |args| {
        let mut world = w.lock();
        if world.take_failure("setValue") {
            return Err(-1);
        }
        let dset = world.dsets.get_mut(&handle_of(&args[0])).expect("live dataset");
        let idx = int(&args[1]) as usize;
        dset.axis_mut(int(&args[2]))[idx] = float(&args[3]);
        Ok(None)
    });
    let w = world.clone();
    fake = fake.function("getN2DValues", 7, false, move |args| {
        let mut world = w.lock();
        let dset = world.dsets.get_mut(&handle_of(&args[0])).expect("live dataset");
        let (xn, row) = (int(&args[2]) as usize, int(&args[3]) as usize);
        let values = dset.axis_mut(int(&args[5]))[row * xn..(row + 1) * xn].to_vec();
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        args[6].as_buffer_mut().expect("row buffer").overwrite(&bytes);
        Ok(None)
    });
    let w = world.clone();
    fake = fake.function("setN2DValues", 7, false, move |args| {
        let mut world = w.lock();
        let (xn, row) = (int(&args[2]) as usize, int(&args[3]) as usize);
        let values = args[6].as_buffer().expect("row buffer").to_f64s(xn);
        let dset = world.dsets.get_mut(&handle_of(&args[0])).expect("live dataset");
        dset.axis_mut(int(&args[5]))[row * xn..(row + 1) * xn].copy_from_slice(&values);
        Ok(None)
    });
    fake = fake.function("storeCopyOfDset", 1, true, |_| Ok(Some(StackValue::Int(1))));
    let w = world.clone();
    fake.function("getTitle", 2, false, move |args| {
        let title = w.lock().dsets[&handle_of(&args[0])].title.clone();
        write_text(&mut args[1], &title);
        Ok(None)
    })
}

/// A parameter of a simulated experiment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeParam {
    pub ty: i32,
    pub dims: usize,
    pub value: StackValue,
    pub indexed: HashMap<Vec<i32>, StackValue>,
    pub units: String,
    pub steps: Vec<(bool, i32)>,
}

impl FakeParam {
    pub fn scalar(ty: i32, value: impl Into<StackValue>) -> Self {
        Self {
            ty,
            dims: 0,
            value: value.into(),
            indexed: HashMap::new(),
            units: String::new(),
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeExperiment {
    pub name: String,
    pub state: i32,
    /// Functional unit -> parameters, in listing order.
    pub units: Vec<(String, Vec<(String, FakeParam)>)>,
}

/// Experiment state of the simulated peer; handles are `0x200 + index`.
#[derive(Debug, Default)]
pub(crate) struct ExpWorld {
    pub experiments: Vec<FakeExperiment>,
    pub selected: HashMap<i32, usize>,
    pub commands: Vec<Vec<StackValue>>,
}

impl ExpWorld {
    fn by_handle(&mut self, value: &StackValue) -> &mut FakeExperiment {
        let idx = (handle_of(value) - 0x200) as usize;
        &mut self.experiments[idx]
    }

    fn param(&mut self, exp: &StackValue, name: &StackValue) -> Option<&mut FakeParam> {
        let name = text(name);
        let (unit, par) = name.split_once('.')?;
        self.by_handle(exp)
            .units
            .iter_mut()
            .find(|(u, _)| u == unit)
            .and_then(|(_, params)| params.iter_mut().find(|(p, _)| p == par))
            .map(|(_, param)| param)
    }
}

fn exp_handle(idx: usize) -> StackValue {
    StackValue::Pointer(Handle(0x200 + idx as i32))
}

fn index_of(value: &StackValue, dims: usize) -> Vec<i32> {
    match value.as_buffer() {
        Some(buf) => buf
            .as_raw()
            .chunks_exact(4)
            .take(dims)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        None => Vec::new(),
    }
}

fn get_param(world: &Arc<Mutex<ExpWorld>>, args: &[StackValue]) -> StackValue {
    let mut world = world.lock();
    let param = world.param(&args[0], &args[1]).expect("known parameter");
    if param.dims == 0 {
        param.value.clone()
    } else {
        let idx = index_of(&args[3], param.dims);
        param.indexed.get(&idx).cloned().unwrap_or(StackValue::Int(0))
    }
}

fn set_param(world: &Arc<Mutex<ExpWorld>>, args: &[StackValue]) {
    let mut world = world.lock();
    let param = world.param(&args[0], &args[1]).expect("known parameter");
    if param.dims == 0 {
        param.value = args[4].clone();
    } else {
        let idx = index_of(&args[3], param.dims);
        param.indexed.insert(idx, args[4].clone());
    }
}

/// Register the experiment surface of the peer, backed by `world`.
pub(crate) fn with_experiments(fake: FakeLibrary, world: &Arc<Mutex<ExpWorld>>) -> FakeLibrary {
    let mut fake = fake
        .command("aqExpNew", "name type abscissa1 abscissa2 ordinate grad gonio vtu")
        .constant("AQ_DT_UNKNOWN", AQ_DT_UNKNOWN)
        .constant("AQ_DT_BOOLEAN", AQ_DT_BOOLEAN)
        .constant("AQ_DT_ENUM", AQ_DT_ENUM)
        .constant("AQ_DT_STRING", AQ_DT_STRING)
        .constant("AQ_EXP_ACTIVE", AQ_EXP_ACTIVE)
        .constant("AQ_EXP_EDIT", AQ_EXP_EDIT)
        .constant("AQ_EXP_PAUSED", AQ_EXP_PAUSED)
        .constant("AQ_EXP_CLOSED", AQ_EXP_CLOSED)
        .constant("AQ_EXP_INSTALLED", AQ_EXP_INSTALLED)
        .constant("AQ_EXP_RUNNING", AQ_EXP_RUNNING);

    let w = world.clone();
    fake = fake.function("aqGetSelectedExp", 1, true, move |args| {
        let world = w.lock();
        Ok(Some(match world.selected.get(&int(&args[0])) {
            Some(idx) => exp_handle(*idx),
            None => StackValue::Pointer(Handle::NULL),
        }))
    });
    let w = world.clone();
    fake = fake.function("aqGetExpNameToBuf", 3, false, move |args| {
        let name = w.lock().by_handle(&args[0]).name.clone();
        write_text(&mut args[1], &name);
        Ok(None)
    });
    let w = world.clone();
    fake = fake.function("aqGetExpByName", 1, true, move |args| {
        let name = text(&args[0]);
        let world = w.lock();
        Ok(Some(
            match world.experiments.iter().position(|e| e.name == name) {
                Some(idx) => exp_handle(idx),
                None => StackValue::Pointer(Handle::NULL),
            },
        ))
    });
    let w = world.clone();
    fake = fake.function("execCmd", -1, false, move |args| {
        let mut world = w.lock();
        world.commands.push(args.to_vec());
        if text(&args[0]) == "aqExpNew" {
            let name = shlex::split(&text(&args[1]))
                .and_then(|tokens| tokens.into_iter().next())
                .unwrap_or_default();
            world.experiments.push(FakeExperiment {
                name,
                state: AQ_EXP_EDIT,
                units: Vec::new(),
            });
            let idx = world.experiments.len() - 1;
            world.selected.insert(-1, idx);
        }
        Ok(None)
    });
    let w = world.clone();
    fake = fake.function("aqGetExpFuList", 3, false, move |args| {
        let units: Vec<String> = w
            .lock()
            .by_handle(&args[0])
            .units
            .iter()
            .map(|(u, _)| u.clone())
            .collect();
        write_text(&mut args[1], &units.join(","));
        Ok(None)
    });
    let w = world.clone();
    fake = fake.function("aqGetExpFuParList", 4, false, move |args| {
        let unit = text(&args[1]);
        let params: Vec<String> = w
            .lock()
            .by_handle(&args[0])
            .units
            .iter()
            .find(|(u, _)| *u == unit)
            .map(|(_, params)| params.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default();
        write_text(&mut args[2], &params.join(","));
        Ok(None)
    });
    let w = world.clone();
    fake = fake.function("aqGetParType", 2, true, move |args| {
        let ty = w
            .lock()
            .param(&args[0], &args[1])
            .map_or(AQ_DT_UNKNOWN, |p| p.ty);
        Ok(Some(StackValue::Int(ty)))
    });
    let w = world.clone();
    fake = fake.function("aqGetParNbDim", 2, true, move |args| {
        let dims = w.lock().param(&args[0], &args[1]).map_or(0, |p| p.dims);
        Ok(Some(StackValue::from(dims)))
    });
    for name in ["aqGetBoolParValue", "aqGetIntParValue", "aqGetRealParValue"] {
        let w = world.clone();
        fake = fake.function(name, 4, true, move |args| Ok(Some(get_param(&w, args))));
    }
    let w = world.clone();
    fake = fake.function("aqGetStrParValue", 6, false, move |args| {
        let value = get_param(&w, args);
        write_text(&mut args[4], &value.to_string());
        Ok(None)
    });
    for name in [
        "aqSetBoolParValue",
        "aqSetIntParValue",
        "aqSetRealParValue",
        "aqSetStrParValue",
    ] {
        let w = world.clone();
        fake = fake.function(name, 5, false, move |args| {
            set_param(&w, args);
            Ok(None)
        });
    }
    let w = world.clone();
    fake = fake.function("aqStepParValue", 6, false, move |args| {
        let fine = args[4].as_bool().unwrap_or(false);
        let steps = int(&args[5]);
        let mut world = w.lock();
        let param = world.param(&args[0], &args[1]).expect("known parameter");
        param.steps.push((fine, steps));
        Ok(None)
    });
    let w = world.clone();
    fake = fake.function("aqGetParUnits", 4, false, move |args| {
        let units = w
            .lock()
            .param(&args[0], &args[1])
            .map(|p| p.units.clone())
            .unwrap_or_default();
        write_text(&mut args[2], &units);
        Ok(None)
    });
    fake = fake.function("aqGetParMinValue", 2, true, |_| Ok(Some(StackValue::Double(0.0))));
    fake = fake.function("aqGetParMaxValue", 2, true, |_| Ok(Some(StackValue::Double(200.0))));
    let w = world.clone();
    fake = fake.function("aqGetExpState", 1, true, move |args| {
        Ok(Some(StackValue::Int(w.lock().by_handle(&args[0]).state)))
    });
    let w = world.clone();
    fake = fake.function("aqExpRun", 1, false, move |args| {
        w.lock().by_handle(&args[0]).state = AQ_EXP_RUNNING;
        Ok(None)
    });
    let w = world.clone();
    fake.function("aqSetSelectedExp", 2, false, move |args| {
        let vp = int(&args[0]);
        let name = text(&args[1]);
        let mut world = w.lock();
        if let Some(idx) = world.experiments.iter().position(|e| e.name == name) {
            world.selected.insert(vp, idx);
        }
        Ok(None)
    })
}

/// The experiment used throughout the tests, selected in viewport -1.
pub(crate) fn cw_experiment() -> ExpWorld {
    let mut power = FakeParam::scalar(AQ_DT_REAL, 20.0);
    power.units = "mW".to_string();
    let bridge = vec![
        ("Power".to_string(), power),
        (
            "AcqFineTuning".to_string(),
            FakeParam::scalar(AQ_DT_ENUM, "Never"),
        ),
        ("Hidden".to_string(), FakeParam::scalar(AQ_DT_UNKNOWN, 0)),
    ];
    let ft = vec![
        ("Attenuation".to_string(), FakeParam::scalar(AQ_DT_REAL, 3.0)),
        ("Tune".to_string(), FakeParam::scalar(AQ_DT_BOOLEAN, false)),
    ];
    let mut delays = FakeParam::scalar(AQ_DT_REAL, 0.0);
    delays.dims = 2;
    let field = vec![
        ("CenterField".to_string(), FakeParam::scalar(AQ_DT_REAL, 3480.0)),
        ("Tune".to_string(), FakeParam::scalar(AQ_DT_BOOLEAN, true)),
        ("Comment".to_string(), FakeParam::scalar(AQ_DT_STRING, "none")),
        ("Delays".to_string(), delays),
    ];
    ExpWorld {
        experiments: vec![FakeExperiment {
            name: "Experiment".to_string(),
            state: AQ_EXP_EDIT,
            units: vec![
                ("cwBridge".to_string(), bridge),
                ("ftBridge".to_string(), ft),
                ("fieldCtrl".to_string(), field),
            ],
        }],
        selected: HashMap::from([(-1, 0)]),
        commands: Vec::new(),
    }
}

/// Convenience: a zero-filled out-buffer argument.
pub(crate) fn buffer(len: usize) -> StackValue {
    StackValue::Buffer(XeprBuf::new(len))
}
