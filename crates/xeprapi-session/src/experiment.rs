//! Experiment proxy and parameter search.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;
use xeprapi_codec::{Handle, StackValue, XeprBuf};

use crate::error::{Result, XeprError};
use crate::parameter::{EnumMode, Parameter};
use crate::session::Session;

const NAME_BUFFER_LEN: usize = 255;
const LIST_BUFFER_LEN: usize = 10_000;

/// Viewport of the currently selected experiment.
pub const CURRENT_VIEWPORT: i32 = -1;

/// A functional unit and the names of its known parameters.
type UnitList = Vec<(String, Vec<String>)>;

/// Builder returned by [`Session::experiment`].
#[derive(Debug)]
pub struct ExperimentBuilder<'s> {
    session: &'s Session,
    viewport: Option<i32>,
    name: Option<String>,
    exp_type: Option<String>,
    abscissa1: Option<String>,
    abscissa2: Option<String>,
    ordinate: Option<String>,
    gradient: bool,
    goniometer: bool,
    temperature: bool,
}

impl<'s> ExperimentBuilder<'s> {
    /// Experiment shown in `viewport`; `-1` is the current one.
    pub fn viewport(mut self, viewport: i32) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Experiment called `name`; built when any build parameter is set.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn exp_type(mut self, exp_type: &str) -> Self {
        self.exp_type = Some(exp_type.to_string());
        self
    }

    pub fn abscissa1(mut self, axis: &str) -> Self {
        self.abscissa1 = Some(axis.to_string());
        self
    }

    pub fn abscissa2(mut self, axis: &str) -> Self {
        self.abscissa2 = Some(axis.to_string());
        self
    }

    pub fn ordinate(mut self, axis: &str) -> Self {
        self.ordinate = Some(axis.to_string());
        self
    }

    pub fn gradient(mut self, on: bool) -> Self {
        self.gradient = on;
        self
    }

    pub fn goniometer(mut self, on: bool) -> Self {
        self.goniometer = on;
        self
    }

    pub fn temperature_unit(mut self, on: bool) -> Self {
        self.temperature = on;
        self
    }

    fn has_build_params(&self) -> bool {
        self.exp_type.is_some()
            || self.abscissa1.is_some()
            || self.abscissa2.is_some()
            || self.ordinate.is_some()
            || self.gradient
            || self.goniometer
            || self.temperature
    }

    pub fn build(self) -> Result<Experiment<'s>> {
        let session = self.session;
        let nil = session.nil();
        match (&self.name, self.viewport) {
            (Some(_), Some(_)) => Err(XeprError::InvalidArgument(
                "either experiment name or viewport allowed only".into(),
            )),
            (None, viewport) => {
                if self.has_build_params() {
                    return Err(XeprError::InvalidArgument(
                        "with a viewport number given no extra arguments are allowed".into(),
                    ));
                }
                let viewport = viewport.unwrap_or(CURRENT_VIEWPORT);
                let handle = session.call_handle("aqGetSelectedExp", vec![viewport.into()])?;
                if handle == nil {
                    return Err(XeprError::Experiment(format!(
                        "unable to retrieve experiment from viewport {viewport}"
                    )));
                }
                let mut args = vec![
                    handle.into(),
                    XeprBuf::new(NAME_BUFFER_LEN).into(),
                    NAME_BUFFER_LEN.into(),
                ];
                session.invoke("aqGetExpNameToBuf", &mut args)?;
                let name = args[1].as_buffer().map(XeprBuf::text).unwrap_or_default();
                Ok(Experiment::new(session, handle, name))
            }
            (Some(name), None) if !self.has_build_params() => {
                let handle = session.call_handle("aqGetExpByName", vec![name.as_str().into()])?;
                if handle == nil {
                    return Err(XeprError::Experiment(format!("no such experiment '{name}'")));
                }
                Ok(Experiment::new(session, handle, name.clone()))
            }
            (Some(name), None) => {
                let args = self.definition(name)?;
                session.commands()?.run("aqExpNew", &args)?;
                let handle =
                    session.call_handle("aqGetSelectedExp", vec![CURRENT_VIEWPORT.into()])?;
                if handle == nil {
                    return Err(XeprError::Experiment(format!(
                        "unable to create experiment '{name}'"
                    )));
                }
                debug!(%handle, name = %name, "experiment created");
                Ok(Experiment::new(session, handle, name.clone()))
            }
        }
    }

    /// Arguments of the `aqExpNew` command, each shell-quoted.
    fn definition(&self, name: &str) -> Result<Vec<StackValue>> {
        let (Some(exp_type), Some(abscissa1), Some(ordinate)) =
            (&self.exp_type, &self.abscissa1, &self.ordinate)
        else {
            return Err(XeprError::InvalidArgument(
                "at least experiment type, first abscissa and ordinate is required to build the experiment"
                    .into(),
            ));
        };
        let abscissa2 = self.abscissa2.as_deref().unwrap_or("None");

        let mut args = Vec::with_capacity(8);
        for token in [
            name,
            exp_type.as_str(),
            abscissa1.as_str(),
            abscissa2,
            ordinate.as_str(),
        ] {
            let quoted = shlex::try_quote(token)
                .map_err(|e| XeprError::InvalidArgument(format!("{token:?}: {e}")))?;
            args.push(StackValue::from(quoted.as_ref()));
        }
        for on in [self.gradient, self.goniometer, self.temperature] {
            args.push(StackValue::from(if on { "On" } else { "Off" }));
        }
        Ok(args)
    }
}

/// One peer experiment.
pub struct Experiment<'s> {
    session: &'s Session,
    handle: Handle,
    name: String,
    units: Mutex<Option<UnitList>>,
    history: Mutex<HashMap<String, String>>,
}

impl Session {
    /// Start building an experiment proxy; defaults to the current experiment.
    pub fn experiment(&self) -> ExperimentBuilder<'_> {
        ExperimentBuilder {
            session: self,
            viewport: None,
            name: None,
            exp_type: None,
            abscissa1: None,
            abscissa2: None,
            ordinate: None,
            gradient: false,
            goniometer: false,
            temperature: false,
        }
    }
}

impl<'s> Experiment<'s> {
    fn new(session: &'s Session, handle: Handle, name: String) -> Self {
        Self {
            session,
            handle,
            name,
            units: Mutex::new(None),
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub(crate) fn session(&self) -> &'s Session {
        self.session
    }

    /// Call a catalogue function with the experiment handle prepended.
    pub fn call(&self, name: &str, args: Vec<StackValue>) -> Result<Option<StackValue>> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(self.handle.into());
        full.extend(args);
        self.session.call(name, full)
    }

    /// Show this experiment in `viewport` and redraw the GUI.
    pub fn select(&self, viewport: i32) -> Result<()> {
        self.session.call(
            "aqSetSelectedExp",
            vec![viewport.into(), self.name.as_str().into()],
        )?;
        self.session.gui_refresh();
        Ok(())
    }

    pub fn state(&self) -> Result<i64> {
        self.session
            .call_i64("aqGetExpState", vec![self.handle.into()])
    }

    fn in_state(&self, constant: &str) -> Result<bool> {
        let expected = self.session.constant(constant)?;
        Ok(Some(self.state()?) == expected.as_i64())
    }

    pub fn is_active(&self) -> Result<bool> {
        self.in_state("AQ_EXP_ACTIVE")
    }

    pub fn is_edit(&self) -> Result<bool> {
        self.in_state("AQ_EXP_EDIT")
    }

    pub fn is_paused(&self) -> Result<bool> {
        self.in_state("AQ_EXP_PAUSED")
    }

    pub fn is_closed(&self) -> Result<bool> {
        self.in_state("AQ_EXP_CLOSED")
    }

    pub fn is_installed(&self) -> Result<bool> {
        self.in_state("AQ_EXP_INSTALLED")
    }

    pub fn is_running(&self) -> Result<bool> {
        self.in_state("AQ_EXP_RUNNING")
    }

    /// Functional units of the experiment.
    pub fn fu_list(&self) -> Result<Vec<String>> {
        Ok(self.units()?.into_iter().map(|(unit, _)| unit).collect())
    }

    /// Parameter names of functional unit `unit`, matched ignoring case.
    pub fn fu_par_list(&self, unit: &str) -> Result<Vec<String>> {
        self.units()?
            .into_iter()
            .find(|(fu, _)| fu.eq_ignore_ascii_case(unit))
            .map(|(_, params)| params)
            .ok_or_else(|| {
                XeprError::Parameter(format!(
                    "no such functional unit '{unit}' in experiment '{}'",
                    self.name
                ))
            })
    }

    /// First fully qualified parameter name matching `query`.
    pub fn find_param(&self, query: &str) -> Result<Option<String>> {
        Ok(self.search(query, false)?.into_iter().next())
    }

    /// Every fully qualified parameter name matching `query`.
    pub fn find_all_params(&self, query: &str) -> Result<Vec<String>> {
        self.search(query, true)
    }

    /// True if `query` names a parameter, or `unit.` names a functional unit.
    pub fn contains(&self, query: &str) -> Result<bool> {
        let query = query.replace('*', "");
        let query = query.trim();
        let parts: Vec<&str> = query.split('.').collect();
        match parts.as_slice() {
            [""] => Ok(false),
            [unit, ""] => Ok(self
                .units()?
                .iter()
                .any(|(fu, _)| fu.eq_ignore_ascii_case(unit))),
            [_] | [_, _] => Ok(self.find_param(query)?.is_some()),
            _ => Ok(false),
        }
    }

    /// Parameter proxy for `name`; enums read as strings.
    pub fn param(&self, name: &str) -> Result<Parameter<'_>> {
        Parameter::new(self, name, EnumMode::default())
    }

    pub fn param_with(&self, name: &str, enum_mode: EnumMode) -> Result<Parameter<'_>> {
        Parameter::new(self, name, enum_mode)
    }

    /// Case-insensitive parameter search.
    ///
    /// A unit filter matches exactly first and falls back to substring
    /// matching. Single results are remembered per query string and
    /// answered from memory on later first-match searches.
    fn search(&self, query: &str, all: bool) -> Result<Vec<String>> {
        let query = query.replace('*', "");
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        if !all {
            if let Some(hit) = self.history.lock().get(query) {
                return Ok(vec![hit.clone()]);
            }
        }

        let parts: Vec<&str> = query.split('.').collect();
        let (filter, name) = match parts.as_slice() {
            [name] => (None, *name),
            [unit, name] => (Some(*unit).filter(|u| !u.is_empty()), *name),
            _ => return Ok(Vec::new()),
        };

        let units = self.units()?;
        let mut hits = Vec::new();
        for (unit, params) in matching_units(&units, filter) {
            for param in params {
                if param.eq_ignore_ascii_case(name) {
                    hits.push(format!("{unit}.{param}"));
                    if !all {
                        break;
                    }
                }
            }
            if !all && !hits.is_empty() {
                break;
            }
        }

        if let [hit] = hits.as_slice() {
            self.history.lock().insert(query.to_string(), hit.clone());
        }
        debug!(query, hits = hits.len(), "parameter search");
        Ok(hits)
    }

    /// Functional units with their known parameters, fetched once.
    fn units(&self) -> Result<UnitList> {
        let mut cache = self.units.lock();
        if let Some(units) = cache.as_ref() {
            return Ok(units.clone());
        }

        let unknown = self.session.constant("AQ_DT_UNKNOWN")?;
        let mut units = Vec::new();
        for unit in self.list("aqGetExpFuList", None)? {
            let mut params = Vec::new();
            for param in self.list("aqGetExpFuParList", Some(&unit))? {
                let ty = self
                    .call("aqGetParType", vec![format!("{unit}.{param}").into()])?
                    .and_then(|v| v.as_i64());
                if ty != unknown.as_i64() {
                    params.push(param);
                }
            }
            units.push((unit, params));
        }
        debug!(experiment = %self.name, units = units.len(), "functional units cached");
        *cache = Some(units.clone());
        Ok(units)
    }

    /// Comma-separated list returned through an out-buffer.
    fn list(&self, function: &str, unit: Option<&str>) -> Result<Vec<String>> {
        let mut args: Vec<StackValue> = vec![self.handle.into()];
        args.extend(unit.map(StackValue::from));
        let slot = args.len();
        args.push(XeprBuf::new(LIST_BUFFER_LEN).into());
        args.push(LIST_BUFFER_LEN.into());
        self.session.invoke(function, &mut args)?;
        let text = args[slot].as_buffer().map(XeprBuf::text).unwrap_or_default();
        Ok(text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn matching_units<'u>(
    units: &'u [(String, Vec<String>)],
    filter: Option<&str>,
) -> Vec<&'u (String, Vec<String>)> {
    let Some(filter) = filter else {
        return units.iter().collect();
    };
    let exact: Vec<_> = units
        .iter()
        .filter(|(unit, _)| unit.eq_ignore_ascii_case(filter))
        .collect();
    if !exact.is_empty() {
        return exact;
    }
    let needle = filter.to_lowercase();
    units
        .iter()
        .filter(|(unit, _)| unit.to_lowercase().contains(&needle))
        .collect()
}

impl fmt::Debug for Experiment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}
