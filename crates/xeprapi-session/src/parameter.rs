use serde::Serialize;
use tracing::debug;
use xeprapi_codec::{StackValue, XeprBuf};

use crate::error::{Result, XeprError};
use crate::experiment::Experiment;

/// Declared type of an experiment parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Boolean,
    Enum,
    String,
    Real,
}

/// How enum parameters are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumMode {
    /// The label of the selected entry.
    #[default]
    Str,
    /// The ordinal of the selected entry.
    Int,
}

/// One parameter of an experiment, bound to its fully qualified name.
#[derive(Debug)]
pub struct Parameter<'a> {
    experiment: &'a Experiment<'a>,
    name: String,
    ty: ParamType,
    dim: usize,
    enum_mode: EnumMode,
}

impl<'a> Parameter<'a> {
    /// Resolve `name` directly, else through the experiment's search.
    pub(crate) fn new(
        experiment: &'a Experiment<'a>,
        name: &str,
        enum_mode: EnumMode,
    ) -> Result<Self> {
        let session = experiment.session();
        let unknown = session.constant("AQ_DT_UNKNOWN")?.as_i64();

        let mut resolved = name.to_string();
        let mut raw_type = type_code(experiment, &resolved)?;
        if raw_type == unknown {
            let mut matches = experiment.find_all_params(name)?;
            if matches.len() > 1 {
                return Err(XeprError::AmbiguousParameter {
                    query: name.to_string(),
                    experiment: experiment.name().to_string(),
                    matches,
                });
            }
            if let Some(only) = matches.pop() {
                resolved = only;
                raw_type = type_code(experiment, &resolved)?;
            }
            if raw_type == unknown {
                return Err(XeprError::Parameter(format!(
                    "no such parameter '{resolved}' in experiment '{}'",
                    experiment.name()
                )));
            }
        }

        let is = |constant: &str| -> Result<bool> {
            Ok(raw_type == session.constant(constant)?.as_i64())
        };
        let ty = if is("AQ_DT_BOOLEAN")? {
            ParamType::Boolean
        } else if is("AQ_DT_ENUM")? {
            ParamType::Enum
        } else if is("AQ_DT_STRING")? {
            ParamType::String
        } else {
            ParamType::Real
        };

        let dim = experiment
            .call("aqGetParNbDim", vec![resolved.as_str().into()])?
            .and_then(|v| v.as_i64())
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(0);

        debug!(name = %resolved, ?ty, dim, "parameter bound");
        Ok(Self {
            experiment,
            name: resolved,
            ty,
            dim,
            enum_mode,
        })
    }

    /// Fully qualified name, `unit.Parameter`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParamType {
        self.ty
    }

    /// Number of index dimensions; 0 for scalars.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn enum_mode(&self) -> EnumMode {
        self.enum_mode
    }

    /// Value of a scalar parameter.
    pub fn value(&self) -> Result<StackValue> {
        self.require_scalar()?;
        self.read(StackValue::Int(0), self.nil())
    }

    pub fn set_value(&self, value: impl Into<StackValue>) -> Result<()> {
        self.require_scalar()?;
        self.write(StackValue::Int(0), self.nil(), value.into())
    }

    /// Element of an indexed parameter; `index` needs `dim` components.
    pub fn get(&self, index: &[i32]) -> Result<StackValue> {
        let (size, pointer) = self.index(index)?;
        self.read(size, pointer)
    }

    pub fn set(&self, index: &[i32], value: impl Into<StackValue>) -> Result<()> {
        let (size, pointer) = self.index(index)?;
        self.write(size, pointer, value.into())
    }

    /// Step the value by `steps` coarse or fine increments.
    pub fn step(&self, steps: i32, fine: bool) -> Result<()> {
        self.call(
            "aqStepParValue",
            vec![StackValue::Int(1), self.nil(), fine.into(), steps.into()],
        )?;
        Ok(())
    }

    pub fn units(&self) -> Result<String> {
        self.text("aqGetParUnits")
    }

    pub fn label(&self) -> Result<String> {
        self.text("aqGetParLabel")
    }

    pub fn min(&self) -> Result<f64> {
        self.number("aqGetParMinValue")
    }

    pub fn max(&self) -> Result<f64> {
        self.number("aqGetParMaxValue")
    }

    /// Call a catalogue function with experiment handle and name prepended.
    pub fn call(&self, function: &str, args: Vec<StackValue>) -> Result<Option<StackValue>> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(self.name.as_str().into());
        full.extend(args);
        self.experiment.call(function, full)
    }

    fn read(&self, size: StackValue, pointer: StackValue) -> Result<StackValue> {
        let function = match (self.ty, self.enum_mode) {
            (ParamType::Boolean, _) => "aqGetBoolParValue",
            (ParamType::Real, _) => "aqGetRealParValue",
            (ParamType::Enum, EnumMode::Int) => "aqGetIntParValue",
            (ParamType::String, _) | (ParamType::Enum, EnumMode::Str) => {
                let text = self.experiment.session().call_text(
                    "aqGetStrParValue",
                    vec![
                        self.experiment.handle().into(),
                        self.name.as_str().into(),
                        size,
                        pointer,
                    ],
                )?;
                return Ok(StackValue::Str(text));
            }
        };
        self.call(function, vec![size, pointer])?
            .ok_or_else(|| XeprError::NoReturnValue(function.to_string()))
    }

    fn write(&self, size: StackValue, pointer: StackValue, value: StackValue) -> Result<()> {
        let (function, value) = match self.ty {
            ParamType::Boolean => {
                let v = value.as_bool().ok_or_else(|| self.bad_value("a boolean", &value))?;
                ("aqSetBoolParValue", StackValue::Bool(v))
            }
            ParamType::Real => {
                let v = value.as_f64().ok_or_else(|| self.bad_value("a number", &value))?;
                ("aqSetRealParValue", StackValue::Double(v))
            }
            ParamType::String => match value {
                StackValue::Str(_) => ("aqSetStrParValue", value),
                other => return Err(self.bad_value("a string", &other)),
            },
            ParamType::Enum => match value {
                StackValue::Str(_) => ("aqSetStrParValue", value),
                StackValue::Int(_) | StackValue::Long(_) | StackValue::Short(_) => {
                    let v = value.as_i64().and_then(|v| i32::try_from(v).ok());
                    let v = v.ok_or_else(|| self.bad_value("an integer or a string", &value))?;
                    ("aqSetIntParValue", StackValue::Int(v))
                }
                other => return Err(self.bad_value("an integer or a string", &other)),
            },
        };
        self.call(function, vec![size, pointer, value])?;
        Ok(())
    }

    fn index(&self, index: &[i32]) -> Result<(StackValue, StackValue)> {
        if self.dim == 0 {
            return Err(XeprError::Index(
                "parameter is a scalar, use value() to access it".into(),
            ));
        }
        if index.len() != self.dim {
            return Err(XeprError::Index(format!(
                "parameter has {} dimensions, given index has {} dimensions",
                self.dim,
                index.len()
            )));
        }
        Ok((self.dim.into(), XeprBuf::from_i32s(index).into()))
    }

    fn require_scalar(&self) -> Result<()> {
        if self.dim != 0 {
            return Err(XeprError::Parameter(format!(
                "parameter '{}' in experiment '{}' is not a scalar (has {} dimensions)",
                self.name,
                self.experiment.name(),
                self.dim
            )));
        }
        Ok(())
    }

    fn nil(&self) -> StackValue {
        self.experiment.session().nil().into()
    }

    fn text(&self, function: &str) -> Result<String> {
        self.experiment.session().call_text(
            function,
            vec![self.experiment.handle().into(), self.name.as_str().into()],
        )
    }

    fn number(&self, function: &str) -> Result<f64> {
        let value = self
            .call(function, Vec::new())?
            .ok_or_else(|| XeprError::NoReturnValue(function.to_string()))?;
        value.as_f64().ok_or_else(|| XeprError::UnexpectedReturn {
            name: function.to_string(),
            expected: "number",
            got: value.stack_type(),
        })
    }

    fn bad_value(&self, expected: &str, value: &StackValue) -> XeprError {
        XeprError::InvalidArgument(format!(
            "parameter '{}' needs {expected}, got a {} value",
            self.name,
            value.stack_type()
        ))
    }
}

fn type_code(experiment: &Experiment<'_>, name: &str) -> Result<Option<i64>> {
    Ok(experiment
        .call("aqGetParType", vec![name.into()])?
        .and_then(|v| v.as_i64()))
}
