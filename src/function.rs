use std::fmt::{Display, Formatter};
use std::str::FromStr;

use lazy_regex::{lazy_regex, Lazy};
use log::{debug, trace};
use regex::Regex;

use crate::aperture::{ApertureCode, ApertureTable};
use crate::coordinates::Coordinates;
use crate::error::{DocumentError, Result};
use crate::format::FormatSpec;
use crate::types::{InterpolationMode, QuadrantMode, Winding};

static RE_CODE: Lazy<Regex> = lazy_regex!(r"^(?P<letter>[GM])(?P<number>[0-9]{1,3})$");
static RE_OPERATION: Lazy<Regex> = lazy_regex!(r"^D0?(?P<number>[1-3])$");
static RE_PARAMETER: Lazy<Regex> = lazy_regex!(r"^(?P<name>[A-Z]{2})(?P<body>[^%*]*)$");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodeLetter {
    G,
    M,
}

/// How the code catalogue treats a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStatus {
    Recognized(CodeKind),
    /// Still seen in older files, only accepted while `ignore_invalid` is set.
    Deprecated,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Interpolation(InterpolationMode),
    Comment,
    RegionBegin,
    RegionEnd,
    Quadrant(QuadrantMode),
    EndOfProgram,
}

/// A G or M code. Compared by letter and number, so `G1` equals `G01`, the text is kept as given.
#[derive(Debug, Clone, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Code {
    raw: String,
    letter: CodeLetter,
    number: u32,
}

impl Code {
    pub const COMMENT: &'static str = "G04";

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn letter(&self) -> CodeLetter {
        self.letter
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn status(&self) -> CodeStatus {
        match (self.letter, self.number) {
            (CodeLetter::G, 1) => CodeStatus::Recognized(CodeKind::Interpolation(InterpolationMode::Linear)),
            (CodeLetter::G, 2) => CodeStatus::Recognized(CodeKind::Interpolation(InterpolationMode::Circular(
                Winding::Clockwise,
            ))),
            (CodeLetter::G, 3) => CodeStatus::Recognized(CodeKind::Interpolation(InterpolationMode::Circular(
                Winding::CounterClockwise,
            ))),
            (CodeLetter::G, 4) => CodeStatus::Recognized(CodeKind::Comment),
            (CodeLetter::G, 36) => CodeStatus::Recognized(CodeKind::RegionBegin),
            (CodeLetter::G, 37) => CodeStatus::Recognized(CodeKind::RegionEnd),
            (CodeLetter::G, 74) => CodeStatus::Recognized(CodeKind::Quadrant(QuadrantMode::Single)),
            (CodeLetter::G, 75) => CodeStatus::Recognized(CodeKind::Quadrant(QuadrantMode::Multi)),
            (CodeLetter::M, 2) => CodeStatus::Recognized(CodeKind::EndOfProgram),
            (CodeLetter::G, 54 | 55 | 70 | 71 | 90 | 91) | (CodeLetter::M, 0 | 1) => CodeStatus::Deprecated,
            _ => CodeStatus::Unknown,
        }
    }

    pub fn kind(&self) -> Option<CodeKind> {
        match self.status() {
            CodeStatus::Recognized(kind) => Some(kind),
            _ => None,
        }
    }

    fn check_known(&self, ignore_invalid: bool) -> Result<()> {
        match self.status() {
            CodeStatus::Recognized(_) => Ok(()),
            CodeStatus::Deprecated | CodeStatus::Unknown if ignore_invalid => {
                debug!("accepting code {} verbatim", self.raw);
                Ok(())
            }
            CodeStatus::Deprecated => Err(DocumentError::UnknownCode(format!("{} (deprecated)", self.raw))),
            CodeStatus::Unknown => Err(DocumentError::UnknownCode(self.raw.clone())),
        }
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.letter == other.letter && self.number == other.number
    }
}

impl FromStr for Code {
    type Err = DocumentError;

    fn from_str(raw: &str) -> Result<Self> {
        let captures = RE_CODE
            .captures(raw)
            .ok_or_else(|| DocumentError::validation(format!("malformed code: '{}'", raw)))?;

        let letter = match &captures["letter"] {
            "G" => CodeLetter::G,
            _ => CodeLetter::M,
        };
        let number = captures["number"]
            .parse::<u32>()
            .map_err(|error| DocumentError::validation(format!("malformed code: '{}', {}", raw, error)))?;

        Ok(Self {
            raw: raw.to_string(),
            letter,
            number,
        })
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    /// D01
    Draw,
    /// D02
    Move,
    /// D03
    Flash,
}

impl FromStr for Operation {
    type Err = DocumentError;

    fn from_str(raw: &str) -> Result<Self> {
        let captures = RE_OPERATION
            .captures(raw)
            .ok_or_else(|| DocumentError::validation(format!("malformed operation: '{}'", raw)))?;

        Ok(match &captures["number"] {
            "1" => Operation::Draw,
            "2" => Operation::Move,
            _ => Operation::Flash,
        })
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Draw => f.write_str("D01"),
            Operation::Move => f.write_str("D02"),
            Operation::Flash => f.write_str("D03"),
        }
    }
}

/// An extended-code parameter such as `LPD` or `SRX2Y3I1.0J2.0`, identified by its two-letter name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    raw: String,
}

impl Parameter {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.raw[..2]
    }

    pub fn body(&self) -> &str {
        &self.raw[2..]
    }

    fn check_known(&self, ignore_invalid: bool) -> Result<()> {
        match self.name() {
            "LP" => match self.body() {
                "D" | "C" => Ok(()),
                body => Err(DocumentError::validation(format!("layer polarity must be D or C, got '{}'", body))),
            },
            "LM" | "LR" | "LS" | "SR" | "TF" | "TA" | "TO" | "TD" => Ok(()),
            "FS" | "MO" | "AD" | "AM" => Err(DocumentError::validation(format!(
                "parameter {} is set through the format, aperture and macro operations",
                self.name()
            ))),
            _ if ignore_invalid => {
                debug!("accepting parameter {} verbatim", self.raw);
                Ok(())
            }
            "IP" | "IR" | "MI" | "OF" | "SF" | "AS" | "IN" | "LN" => {
                Err(DocumentError::UnknownCode(format!("{} (deprecated)", self.raw)))
            }
            _ => Err(DocumentError::UnknownCode(self.raw.clone())),
        }
    }
}

impl FromStr for Parameter {
    type Err = DocumentError;

    fn from_str(raw: &str) -> Result<Self> {
        if !RE_PARAMETER.is_match(raw) {
            return Err(DocumentError::validation(format!("malformed parameter: '{}'", raw)));
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }
}

/// One recorded function. Functions never change once appended.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Function {
    ApertureSelect(ApertureCode),
    Code(Code),
    Move {
        code: Option<Code>,
        coordinates: Coordinates,
        operation: Operation,
    },
    Parameter(Parameter),
    Comment {
        code: Code,
        text: String,
    },
}

impl Function {
    pub fn code(&self) -> Option<&Code> {
        match self {
            Function::Code(code) => Some(code),
            Function::Move {
                code, ..
            } => code.as_ref(),
            Function::Comment {
                code, ..
            } => Some(code),
            Function::ApertureSelect(_) | Function::Parameter(_) => None,
        }
    }

    fn from_input(input: FunctionInput) -> Result<Self> {
        match input {
            FunctionInput::Aperture(code) => Ok(Function::ApertureSelect(code.parse()?)),
            FunctionInput::Parameter(raw) => Ok(Function::Parameter(raw.parse()?)),
            FunctionInput::Function {
                func,
                coord,
                op,
                comment,
            } => {
                let code = func
                    .as_deref()
                    .map(Code::from_str)
                    .transpose()?;

                match (comment, op) {
                    (Some(_), Some(_)) => Err(DocumentError::validation("a comment cannot carry an operation")),
                    (Some(_), None) if coord.is_some() => {
                        Err(DocumentError::validation("a comment cannot carry coordinates"))
                    }
                    (Some(text), None) => {
                        let code = match code {
                            Some(code) => code,
                            None => Code::COMMENT.parse()?,
                        };
                        if code.kind() != Some(CodeKind::Comment) {
                            return Err(DocumentError::validation(format!(
                                "comments attach to {} only, got {}",
                                Code::COMMENT,
                                code
                            )));
                        }
                        if text.contains(['*', '%']) {
                            return Err(DocumentError::validation(format!("comment contains a delimiter: '{}'", text)));
                        }
                        Ok(Function::Comment {
                            code,
                            text,
                        })
                    }
                    (None, Some(op)) => Ok(Function::Move {
                        code,
                        coordinates: Coordinates::parse(coord.as_deref().unwrap_or_default())?,
                        operation: op.parse()?,
                    }),
                    (None, None) => match (code, coord) {
                        (_, Some(coord)) => Err(DocumentError::validation(format!(
                            "coordinate '{}' without an operation",
                            coord
                        ))),
                        (Some(code), None) => Ok(Function::Code(code)),
                        (None, None) => Err(DocumentError::validation("empty function")),
                    },
                }
            }
        }
    }
}

impl Display for Function {
    /// The function as Gerber source, e.g. `G01X100Y100D01*` or `%LPD*%`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Function::ApertureSelect(code) => write!(f, "{}*", code),
            Function::Code(code) => write!(f, "{}*", code),
            Function::Move {
                code,
                coordinates,
                operation,
            } => {
                if let Some(code) = code {
                    write!(f, "{}", code)?;
                }
                write!(f, "{}{}*", coordinates.raw(), operation)
            }
            Function::Parameter(parameter) => write!(f, "%{}*%", parameter.as_str()),
            Function::Comment {
                code,
                text,
            } => write!(f, "{} {}*", code, text),
        }
    }
}

/// Input for [`crate::GerberDocument::append`], one variant per kind of function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionInput {
    Aperture(String),
    Parameter(String),
    /// A code on its own, a comment, or an operation with an optional code and coordinates.
    Function {
        func: Option<String>,
        coord: Option<String>,
        op: Option<String>,
        comment: Option<String>,
    },
}

impl FunctionInput {
    pub fn aperture(code: impl Into<String>) -> Self {
        FunctionInput::Aperture(code.into())
    }

    pub fn parameter(raw: impl Into<String>) -> Self {
        FunctionInput::Parameter(raw.into())
    }

    pub fn code(func: impl Into<String>) -> Self {
        FunctionInput::Function {
            func: Some(func.into()),
            coord: None,
            op: None,
            comment: None,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        FunctionInput::Function {
            func: None,
            coord: None,
            op: None,
            comment: Some(text.into()),
        }
    }

    pub fn operation(coord: impl Into<String>, op: impl Into<String>) -> Self {
        FunctionInput::Function {
            func: None,
            coord: Some(coord.into()),
            op: Some(op.into()),
            comment: None,
        }
    }

    pub fn coded_operation(func: impl Into<String>, coord: impl Into<String>, op: impl Into<String>) -> Self {
        FunctionInput::Function {
            func: Some(func.into()),
            coord: Some(coord.into()),
            op: Some(op.into()),
            comment: None,
        }
    }
}

/// The loose key set a text parser produces, resolved into a [`FunctionInput`] with fixed precedence:
/// `aperture` wins over everything, then `param`, otherwise `func`, `coord`, `op` and `comment` combine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionOptions {
    pub aperture: Option<String>,
    pub param: Option<String>,
    pub func: Option<String>,
    pub coord: Option<String>,
    pub op: Option<String>,
    pub comment: Option<String>,
}

impl FunctionOptions {
    pub fn resolve(self) -> FunctionInput {
        let Self {
            aperture,
            param,
            func,
            coord,
            op,
            comment,
        } = self;

        if let Some(aperture) = aperture {
            if param.is_some() || func.is_some() || coord.is_some() || op.is_some() || comment.is_some() {
                debug!("aperture {} takes precedence, other keys ignored", aperture);
            }
            return FunctionInput::Aperture(aperture);
        }
        if let Some(param) = param {
            if func.is_some() || coord.is_some() || op.is_some() || comment.is_some() {
                debug!("parameter {} takes precedence, other keys ignored", param);
            }
            return FunctionInput::Parameter(param);
        }
        FunctionInput::Function {
            func,
            coord,
            op,
            comment,
        }
    }
}

/// What appends are validated against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValidationContext<'a> {
    pub format: &'a FormatSpec,
    pub apertures: &'a ApertureTable,
    pub ignore_invalid: bool,
}

/// The ordered, append-only record of functions.
#[derive(Debug, Clone, Default)]
pub struct FunctionSequence {
    functions: Vec<Function>,
    aperture_selected: bool,
    in_region: bool,
}

impl FunctionSequence {
    pub(crate) fn append(&mut self, input: FunctionInput, context: &ValidationContext) -> Result<()> {
        let function = Function::from_input(input)?;
        self.append_function(function, context)
    }

    /// Validate and record. Nothing is recorded when validation fails.
    pub(crate) fn append_function(&mut self, function: Function, context: &ValidationContext) -> Result<()> {
        let mut in_region = self.in_region;

        match &function {
            Function::ApertureSelect(code) => {
                if !context.apertures.contains(code) && !context.ignore_invalid {
                    return Err(DocumentError::UndefinedAperture(code.to_string()));
                }
            }
            Function::Code(code) => {
                code.check_known(context.ignore_invalid)?;
                match code.kind() {
                    Some(CodeKind::RegionBegin) if in_region => {
                        return Err(DocumentError::validation("region started inside a region"));
                    }
                    Some(CodeKind::RegionBegin) => in_region = true,
                    Some(CodeKind::RegionEnd) if !in_region => {
                        return Err(DocumentError::validation("region ended without being started"));
                    }
                    Some(CodeKind::RegionEnd) => in_region = false,
                    _ => {}
                }
            }
            Function::Move {
                code,
                coordinates,
                operation,
            } => {
                if let Some(code) = code {
                    Self::check_move_code(code, context.ignore_invalid)?;
                }

                coordinates.check(context.format)?;
                if coordinates.has_offset() && *operation != Operation::Draw {
                    return Err(DocumentError::validation(format!(
                        "I/J offsets only apply to {}, got {}",
                        Operation::Draw,
                        operation
                    )));
                }

                match operation {
                    Operation::Flash if in_region => {
                        return Err(DocumentError::validation("flash inside a region"));
                    }
                    Operation::Draw if in_region => {}
                    Operation::Draw | Operation::Flash if !self.aperture_selected => {
                        return Err(DocumentError::UndefinedAperture(format!(
                            "{} without a selected aperture",
                            operation
                        )));
                    }
                    _ => {}
                }
            }
            Function::Parameter(parameter) => parameter.check_known(context.ignore_invalid)?,
            Function::Comment {
                code, ..
            } => code.check_known(context.ignore_invalid)?,
        }

        trace!("appending function: {:?}", function);
        if let Function::ApertureSelect(_) = function {
            self.aperture_selected = true;
        }
        self.in_region = in_region;
        self.functions.push(function);
        Ok(())
    }

    fn check_move_code(code: &Code, ignore_invalid: bool) -> Result<()> {
        if code.letter() != CodeLetter::G {
            return Err(DocumentError::validation(format!("operation cannot carry {}", code)));
        }
        match code.status() {
            CodeStatus::Recognized(CodeKind::Interpolation(_)) => Ok(()),
            CodeStatus::Recognized(_) => Err(DocumentError::validation(format!("operation cannot carry {}", code))),
            _ => code.check_known(ignore_invalid),
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Function> {
        self.functions
            .get(index)
            .ok_or(DocumentError::Index {
                index,
                count: self.functions.len(),
            })
    }

    pub fn as_slice(&self) -> &[Function] {
        &self.functions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }
}
