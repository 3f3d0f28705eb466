//! Dataset proxy.
//!
//! A [`Dataset`] mirrors one peer dataset as local arrays. It is either
//! created here with a fixed size (`upstream`, local data is authoritative)
//! or copied lazily from one of the peer's dataset slots. Axis arrays are
//! pulled on first access and cached; every cached axis is pushed back on
//! the next upstream update.
//!
//! ```text
//! Unbound --first access / update--> Bound --release / drop--> Released
//!    \--------------- size/shape at build ----^
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;
use serde::Serialize;
use tracing::debug;
use xeprapi_codec::{Handle, StackValue, XeprBuf};

use crate::error::{Result, XeprError};
use crate::session::Session;

/// One of the peer's four dataset slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    #[default]
    Primary,
    Secondary,
    Result,
    Qualifier,
}

impl Slot {
    pub fn name(self) -> &'static str {
        match self {
            Slot::Primary => "primary",
            Slot::Secondary => "secondary",
            Slot::Result => "result",
            Slot::Qualifier => "qualifier",
        }
    }

    /// Function copying the slot's dataset into a new handle.
    fn getcopy(self) -> &'static str {
        match self {
            Slot::Primary => "getCopyOfPrimary",
            Slot::Secondary => "getCopyOfSecondary",
            Slot::Result => "getCopyOfResult",
            Slot::Qualifier => "getCopyOfQualifier",
        }
    }

    /// Function copying a handle's dataset into the slot.
    fn copyto(self) -> &'static str {
        match self {
            Slot::Primary => "copyDsetToPrimary",
            Slot::Secondary => "copyDsetToSecondary",
            Slot::Result => "copyDsetToResult",
            Slot::Qualifier => "copyDsetToQualifier",
        }
    }
}

impl FromStr for Slot {
    type Err = XeprError;

    /// Matches on the first three letters, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let prefix: String = s.chars().take(3).collect::<String>().to_lowercase();
        match prefix.as_str() {
            "pri" => Ok(Slot::Primary),
            "sec" => Ok(Slot::Secondary),
            "res" => Ok(Slot::Result),
            "qua" => Ok(Slot::Qualifier),
            _ => Err(XeprError::NoSuchDataset(s.to_string())),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dataset axes, in push order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Axis {
    /// First abscissa.
    X,
    /// Second abscissa, 2-D datasets only.
    Y,
    /// Ordinate.
    O,
}

/// Contents of one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisData {
    Real(ArrayD<f64>),
    Complex(ArrayD<Complex64>),
}

impl AxisData {
    pub fn shape(&self) -> &[usize] {
        match self {
            AxisData::Real(a) => a.shape(),
            AxisData::Complex(a) => a.shape(),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, AxisData::Complex(_))
    }

    pub fn as_real(&self) -> Option<&ArrayD<f64>> {
        match self {
            AxisData::Real(a) => Some(a),
            AxisData::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ArrayD<Complex64>> {
        match self {
            AxisData::Complex(a) => Some(a),
            AxisData::Real(_) => None,
        }
    }

    /// Real part.
    pub fn re(&self) -> ArrayD<f64> {
        match self {
            AxisData::Real(a) => a.clone(),
            AxisData::Complex(a) => a.mapv(|c| c.re),
        }
    }

    /// Imaginary part; zeros for real data.
    pub fn im(&self) -> ArrayD<f64> {
        match self {
            AxisData::Real(a) => ArrayD::zeros(a.raw_dim()),
            AxisData::Complex(a) => a.mapv(|c| c.im),
        }
    }
}

impl From<ArrayD<f64>> for AxisData {
    fn from(a: ArrayD<f64>) -> Self {
        AxisData::Real(a)
    }
}

impl From<ArrayD<Complex64>> for AxisData {
    fn from(a: ArrayD<Complex64>) -> Self {
        AxisData::Complex(a)
    }
}

impl From<ndarray::Array1<f64>> for AxisData {
    fn from(a: ndarray::Array1<f64>) -> Self {
        AxisData::Real(a.into_dyn())
    }
}

impl From<ndarray::Array2<f64>> for AxisData {
    fn from(a: ndarray::Array2<f64>) -> Self {
        AxisData::Real(a.into_dyn())
    }
}

impl From<ndarray::Array2<Complex64>> for AxisData {
    fn from(a: ndarray::Array2<Complex64>) -> Self {
        AxisData::Complex(a.into_dyn())
    }
}

impl From<Vec<f64>> for AxisData {
    fn from(v: Vec<f64>) -> Self {
        AxisData::Real(ndarray::Array1::from(v).into_dyn())
    }
}

impl From<Vec<Complex64>> for AxisData {
    fn from(v: Vec<Complex64>) -> Self {
        AxisData::Complex(ndarray::Array1::from(v).into_dyn())
    }
}

/// Options for [`Dataset::update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Invert the default direction.
    pub reverse: bool,
    /// Redraw the peer GUI after pushing.
    pub refresh: bool,
    /// Re-target the dataset before updating.
    pub slot: Option<Slot>,
    /// Keep a copy in peer memory after pushing.
    pub store: bool,
}

/// Builder returned by [`Session::dataset`].
#[derive(Debug)]
pub struct DatasetBuilder<'s> {
    session: &'s Session,
    size: Option<Vec<usize>>,
    shape: Option<Vec<usize>>,
    complex: bool,
    slot: Slot,
    autorefresh: bool,
}

impl<'s> DatasetBuilder<'s> {
    /// Create a new dataset of `(X)` or `(X, Y)` points.
    pub fn size(mut self, size: &[usize]) -> Self {
        self.size = Some(size.to_vec());
        self
    }

    /// Create a new dataset of row-major shape `(X)` or `(Y, X)`.
    pub fn shape(mut self, shape: &[usize]) -> Self {
        self.shape = Some(shape.to_vec());
        self
    }

    pub fn complex(mut self, complex: bool) -> Self {
        self.complex = complex;
        self
    }

    pub fn slot(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }

    pub fn autorefresh(mut self, autorefresh: bool) -> Self {
        self.autorefresh = autorefresh;
        self
    }

    pub fn build(self) -> Result<Dataset<'s>> {
        let size = match (self.size, self.shape) {
            (Some(_), Some(_)) => {
                return Err(XeprError::InvalidArgument(
                    "either size or shape argument allowed only".into(),
                ))
            }
            (Some(size), None) => Some(size),
            (None, Some(shape)) => Some(shape.into_iter().rev().collect()),
            (None, None) => None,
        };

        let mut dataset = Dataset {
            session: self.session,
            slot: self.slot,
            autorefresh: self.autorefresh,
            handle: None,
            upstream: false,
            shape: None,
            complex: None,
            cache: HashMap::new(),
            dirty: BTreeSet::new(),
            released: false,
        };

        let Some(size) = size else {
            return Ok(dataset);
        };
        let complex = StackValue::Bool(self.complex);
        let handle = match size.as_slice() {
            [x] => self
                .session
                .call_handle("createDset", vec![complex, (*x).into()])?,
            [x, y] => self.session.call_handle(
                "create2DDset",
                vec![complex, (*x).into(), (*y).into()],
            )?,
            _ => {
                return Err(XeprError::InvalidArgument(format!(
                    "size must have one or two dimensions, got {}",
                    size.len()
                )))
            }
        };
        if handle == self.session.nil() {
            return Err(XeprError::Dataset("could not create dataset".into()));
        }

        debug!(%handle, ?size, complex = self.complex, "dataset created");
        dataset.handle = Some(handle);
        dataset.upstream = true;
        dataset.shape = Some(size.into_iter().rev().collect());
        dataset.complex = Some(self.complex);
        Ok(dataset)
    }
}

/// Local mirror of a peer dataset.
pub struct Dataset<'s> {
    session: &'s Session,
    slot: Slot,
    autorefresh: bool,
    handle: Option<Handle>,
    upstream: bool,
    /// Row-major: `[X]` or `[Y, X]`.
    shape: Option<Vec<usize>>,
    complex: Option<bool>,
    cache: HashMap<Axis, AxisData>,
    dirty: BTreeSet<Axis>,
    released: bool,
}

impl Session {
    /// Start building a dataset proxy.
    pub fn dataset(&self) -> DatasetBuilder<'_> {
        DatasetBuilder {
            session: self,
            size: None,
            shape: None,
            complex: false,
            slot: Slot::default(),
            autorefresh: false,
        }
    }
}

impl<'s> Dataset<'s> {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn set_slot(&mut self, slot: Slot) {
        self.slot = slot;
    }

    /// True when local data is authoritative (created with a size).
    pub fn is_upstream(&self) -> bool {
        self.upstream
    }

    pub fn autorefresh(&self) -> bool {
        self.autorefresh
    }

    pub fn set_autorefresh(&mut self, autorefresh: bool) {
        self.autorefresh = autorefresh;
    }

    /// The remote handle, copying from the slot if none is held yet.
    pub fn handle(&mut self) -> Result<Handle> {
        match self.handle {
            Some(handle) => Ok(handle),
            None => self.acquire(),
        }
    }

    /// Row-major shape: `[X]` or `[Y, X]`.
    pub fn shape(&mut self) -> Result<Vec<usize>> {
        self.bound()?;
        Ok(self.shape.clone().unwrap_or_default())
    }

    /// Shape in `(X, Y)` order.
    pub fn size(&mut self) -> Result<Vec<usize>> {
        let mut shape = self.shape()?;
        shape.reverse();
        Ok(shape)
    }

    pub fn is_complex(&mut self) -> Result<bool> {
        self.bound()?;
        Ok(self.complex.unwrap_or(false))
    }

    /// Probe the slot without binding to it.
    pub fn dataset_available(&self) -> bool {
        let session = self.session;
        match session.call_handle(self.slot.getcopy(), Vec::new()) {
            Ok(handle) if handle != session.nil() => {
                if let Err(err) = session.call("destroyDset", vec![handle.into()]) {
                    debug!(%err, "could not destroy probe copy");
                }
                true
            }
            _ => false,
        }
    }

    /// Contents of `axis`, pulled from the peer on first access.
    pub fn axis(&mut self, axis: Axis) -> Result<&AxisData> {
        self.ensure_cached(axis)?;
        Ok(&self.cache[&axis])
    }

    /// Mutable contents of `axis`; marks it for the next push.
    pub fn axis_mut(&mut self, axis: Axis) -> Result<&mut AxisData> {
        self.ensure_cached(axis)?;
        self.dirty.insert(axis);
        self.cache
            .get_mut(&axis)
            .ok_or_else(|| XeprError::Dataset(format!("axis {axis:?} not cached")))
    }

    /// Replace the contents of `axis`.
    pub fn set_axis(&mut self, axis: Axis, data: impl Into<AxisData>) -> Result<()> {
        let data = data.into();
        if self.bound().is_err() {
            return Err(XeprError::Dataset(format!(
                "no dataset available, cannot set {axis:?}"
            )));
        }
        let shape = self.shape.clone().unwrap_or_default();
        let complex = self.complex.unwrap_or(false);
        let ok = match axis {
            Axis::O => {
                if data.is_complex() && !complex {
                    return Err(XeprError::InvalidArgument(
                        "complex ordinate for a real dataset".into(),
                    ));
                }
                data.shape() == shape.as_slice()
            }
            Axis::X | Axis::Y => {
                if axis == Axis::Y && shape.len() < 2 {
                    return Err(one_dimensional());
                }
                if data.is_complex() {
                    return Err(XeprError::InvalidArgument(
                        "abscissa values must be real".into(),
                    ));
                }
                let expected = if axis == Axis::X { shape.last() } else { shape.first() };
                data.shape().len() == 1 && Some(&data.shape()[0]) == expected
            }
        };
        if !ok {
            return Err(XeprError::Dimension(format!(
                "shape {:?} of {axis:?} does not match dataset shape {shape:?}",
                data.shape()
            )));
        }
        self.cache.insert(axis, data);
        self.dirty.insert(axis);
        Ok(())
    }

    /// Synchronize with the peer.
    ///
    /// Pushes when `upstream XOR reverse`, otherwise re-pulls from the slot.
    /// A push with `store` returns the result of storing the copy.
    pub fn update(&mut self, opts: UpdateOptions) -> Result<Option<StackValue>> {
        if let Some(slot) = opts.slot {
            self.set_slot(slot);
        }
        if self.upstream ^ opts.reverse {
            let handle = self.handle()?;
            self.push_dirty(handle)?;
            self.session
                .call(self.slot.copyto(), vec![handle.into()])?;
            debug!(%handle, slot = %self.slot, "dataset pushed");
            if self.autorefresh || opts.refresh {
                self.session.gui_refresh();
            }
            if opts.store {
                return self.session.call("storeCopyOfDset", vec![handle.into()]);
            }
        } else {
            if let Some(handle) = self.handle.take() {
                self.session.call("destroyDset", vec![handle.into()])?;
            }
            self.acquire()?;
        }
        Ok(None)
    }

    /// Replace local data with the peer's.
    pub fn from_xepr(&mut self, slot: Option<Slot>) -> Result<()> {
        self.update(UpdateOptions {
            reverse: self.upstream,
            slot,
            ..UpdateOptions::default()
        })?;
        Ok(())
    }

    /// Push local data to the peer.
    pub fn to_xepr(
        &mut self,
        refresh: bool,
        slot: Option<Slot>,
        store: bool,
    ) -> Result<Option<StackValue>> {
        self.update(UpdateOptions {
            reverse: !self.upstream,
            refresh,
            slot,
            store,
        })
    }

    /// Call a catalogue function with this dataset's handle prepended.
    pub fn call(&mut self, name: &str, args: Vec<StackValue>) -> Result<Option<StackValue>> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(self.handle()?.into());
        full.extend(args);
        self.session.call(name, full)
    }

    pub fn title(&mut self) -> Result<String> {
        let handle = self.handle()?;
        self.session.title(handle)
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.call("setTitle", vec![title.into()])?;
        Ok(())
    }

    /// Free the remote handle. Shape and type queries fail afterwards.
    pub fn release(&mut self) -> Result<()> {
        let handle = self.handle.take();
        self.upstream = false;
        self.shape = None;
        self.complex = None;
        self.cache.clear();
        self.dirty.clear();
        self.released = true;
        if let Some(handle) = handle {
            self.session.call("destroyDset", vec![handle.into()])?;
            debug!(%handle, "dataset released");
        }
        Ok(())
    }

    fn bound(&mut self) -> Result<Handle> {
        if self.released {
            return Err(XeprError::Dataset("dataset has been released".into()));
        }
        self.handle()
    }

    /// Copy the slot's dataset into a fresh handle and reset local state.
    fn acquire(&mut self) -> Result<Handle> {
        if self.released {
            return Err(XeprError::Dataset("dataset has been released".into()));
        }
        let session = self.session;
        let handle = session.call_handle(self.slot.getcopy(), Vec::new())?;
        if handle == session.nil() {
            return Err(XeprError::Dataset("could not retrieve dataset from Xepr".into()));
        }

        self.handle = Some(handle);
        self.cache.clear();
        self.dirty.clear();
        self.complex = Some(session.call_bool("isComplex", vec![handle.into()])?);

        let points = |axis: &str| -> Result<usize> {
            let code = session.constant(axis)?;
            let n = session.call_i64("getNrOfPoints", vec![handle.into(), code])?;
            Ok(usize::try_from(n).unwrap_or(0))
        };
        let shape = if session.call_i64("getDimension", vec![handle.into()])? == 1 {
            vec![points("X_ABSC")?]
        } else {
            vec![points("Y_ABSC")?, points("X_ABSC")?]
        };
        debug!(%handle, slot = %self.slot, ?shape, "dataset acquired");
        self.shape = Some(shape);
        Ok(handle)
    }

    fn ensure_cached(&mut self, axis: Axis) -> Result<()> {
        let handle = self.bound()?;
        let shape = self.shape.clone().unwrap_or_default();
        if axis == Axis::Y && shape.len() < 2 {
            return Err(one_dimensional());
        }
        if !self.cache.contains_key(&axis) {
            let data = self.pull(handle, axis, &shape)?;
            self.cache.insert(axis, data);
            self.dirty.insert(axis);
        }
        Ok(())
    }

    fn pull(&self, handle: Handle, axis: Axis, shape: &[usize]) -> Result<AxisData> {
        let x = shape.last().copied().unwrap_or(0);
        match axis {
            Axis::X => Ok(self.get_values(handle, "X_ABSC", x)?.into()),
            Axis::Y => Ok(self.get_values(handle, "Y_ABSC", shape[0])?.into()),
            Axis::O => {
                let read = |ord: &str| -> Result<Vec<f64>> {
                    match shape {
                        [y, x] => self.get_rows(handle, ord, *x, *y),
                        _ => self.get_values(handle, ord, x),
                    }
                };
                let re = read("REAL_ORD")?;
                let dim = IxDyn(shape);
                let data = if self.complex.unwrap_or(false) {
                    let im = read("IMAG_ORD")?;
                    let values = re.into_iter().zip(im).map(|(r, i)| Complex64::new(r, i));
                    AxisData::Complex(into_array(dim, values.collect())?)
                } else {
                    AxisData::Real(into_array(dim, re)?)
                };
                Ok(data)
            }
        }
    }

    /// Point-by-point read of one axis or ordinate part.
    fn get_values(&self, handle: Handle, axis: &str, count: usize) -> Result<Vec<f64>> {
        let code = self.session.constant(axis)?;
        (0..count)
            .map(|i| {
                self.session
                    .call_f64("getValue", vec![handle.into(), i.into(), code.clone()])
            })
            .collect()
    }

    /// Row-by-row read of a 2-D ordinate part.
    fn get_rows(&self, handle: Handle, ord: &str, x: usize, y: usize) -> Result<Vec<f64>> {
        let code = self.session.constant(ord)?;
        let mut out = Vec::with_capacity(x * y);
        for row in 0..y {
            let mut args = vec![
                handle.into(),
                StackValue::Int(0),
                x.into(),
                row.into(),
                StackValue::Int(1),
                code.clone(),
                XeprBuf::new(x * std::mem::size_of::<f64>()).into(),
            ];
            self.session.invoke("getN2DValues", &mut args)?;
            if let Some(buf) = args[6].as_buffer() {
                out.extend(buf.to_f64s(x));
            }
        }
        Ok(out)
    }

    /// Push every dirty axis, X before Y before O.
    ///
    /// An axis stays dirty until its push has gone through.
    fn push_dirty(&mut self, handle: Handle) -> Result<()> {
        let shape = self.shape.clone().unwrap_or_default();
        let complex = self.complex.unwrap_or(false);
        let pending: Vec<Axis> = self.dirty.iter().copied().collect();
        for axis in pending {
            let Some(data) = self.cache.get(&axis) else {
                self.dirty.remove(&axis);
                continue;
            };
            match axis {
                Axis::X => self.set_values(handle, "X_ABSC", &data.re())?,
                Axis::Y => self.set_values(handle, "Y_ABSC", &data.re())?,
                Axis::O if shape.len() == 2 => {
                    self.set_rows(handle, "REAL_ORD", &data.re())?;
                    if complex {
                        self.set_rows(handle, "IMAG_ORD", &data.im())?;
                    }
                }
                Axis::O => {
                    self.set_values(handle, "REAL_ORD", &data.re())?;
                    if complex {
                        self.set_values(handle, "IMAG_ORD", &data.im())?;
                    }
                }
            }
            self.dirty.remove(&axis);
            debug!(%handle, ?axis, "axis pushed");
        }
        Ok(())
    }

    fn set_values(&self, handle: Handle, axis: &str, values: &ArrayD<f64>) -> Result<()> {
        let code = self.session.constant(axis)?;
        for (i, v) in values.iter().enumerate() {
            self.session.call(
                "setValue",
                vec![handle.into(), i.into(), code.clone(), StackValue::Double(*v)],
            )?;
        }
        Ok(())
    }

    fn set_rows(&self, handle: Handle, ord: &str, values: &ArrayD<f64>) -> Result<()> {
        let code = self.session.constant(ord)?;
        for (j, row) in values.rows().into_iter().enumerate() {
            let row = row.to_vec();
            self.session.call(
                "setN2DValues",
                vec![
                    handle.into(),
                    StackValue::Int(0),
                    row.len().into(),
                    j.into(),
                    StackValue::Int(1),
                    code.clone(),
                    XeprBuf::from_f64s(&row).into(),
                ],
            )?;
        }
        Ok(())
    }
}

impl Drop for Dataset<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = self.session.call("destroyDset", vec![handle.into()]) {
                debug!(%handle, %err, "could not destroy dataset on drop");
            }
        }
    }
}

impl fmt::Debug for Dataset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("slot", &self.slot)
            .field("handle", &self.handle)
            .field("upstream", &self.upstream)
            .field("shape", &self.shape)
            .field("complex", &self.complex)
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn one_dimensional() -> XeprError {
    XeprError::Dimension("1D dataset, does not have second abscissa".into())
}

fn into_array<T>(dim: IxDyn, values: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(dim, values).map_err(|e| XeprError::Dimension(e.to_string()))
}
