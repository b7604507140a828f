use std::sync::{Mutex, PoisonError};

use log::debug;

use crate::aperture::{Aperture, ApertureCode, ApertureOptions, ApertureTable};
use crate::aperture_macro::{MacroDefinition, MacroTable};
use crate::convert;
use crate::error::Result;
use crate::format::{FormatOptions, FormatSpec, Unit};
use crate::function::{Function, FunctionInput, FunctionOptions, FunctionSequence, ValidationContext};
use crate::geometry::BoundingBox;
use crate::replay::GeometryEngine;

/// An in-memory Gerber document: format, aperture and macro tables and the ordered function sequence.
///
/// Configure the format and define apertures before appending functions. Coordinates are decoded under the format
/// in effect when they are queried, so changing the digit widths after appending re-interprets what was recorded;
/// use [`GerberDocument::convert`] into a fresh document instead.
///
/// Every failing operation stores its message, see [`GerberDocument::last_error`].
#[derive(Debug, Default)]
pub struct GerberDocument {
    pub(crate) format: FormatSpec,
    pub(crate) apertures: ApertureTable,
    pub(crate) macros: MacroTable,
    pub(crate) functions: FunctionSequence,
    ignore_invalid: bool,
    ignore_blank: bool,
    last_error: Mutex<Option<String>>,
}

impl GerberDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            debug!("operation failed: {}", error);
            *self
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());
        }
        result
    }

    /// The message of the most recent failure. Successful operations leave it as it is.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn format(&self) -> &FormatSpec {
        &self.format
    }

    /// Apply a partial format update, nothing is applied when any supplied field is invalid.
    pub fn set_format(&mut self, options: FormatOptions) -> Result<()> {
        let result = self.format.apply(&options);
        self.record(result)
    }

    /// The unit coordinates and aperture sizes are expressed in, inch unless set.
    pub fn unit(&self) -> Unit {
        self.format.effective_unit()
    }

    pub fn set_unit(&mut self, unit: impl ToString) -> Result<()> {
        self.set_format(FormatOptions::new().unit(unit))
    }

    /// Define, or redefine, an aperture.
    pub fn define_aperture(&mut self, options: ApertureOptions) -> Result<()> {
        let result = Aperture::from_options(&options).map(|aperture| self.apertures.define(aperture));
        self.record(result)
    }

    /// `Ok(None)` when `code` is well-formed but not defined.
    pub fn aperture(&self, code: &str) -> Result<Option<&Aperture>> {
        let result = code
            .parse::<ApertureCode>()
            .map(|code| self.apertures.get(&code));
        self.record(result)
    }

    pub fn apertures(&self) -> &ApertureTable {
        &self.apertures
    }

    /// Define, or redefine, an aperture macro. The lines are kept verbatim.
    pub fn define_macro(&mut self, name: &str, lines: Vec<String>) -> Result<()> {
        let result = MacroDefinition::new(name, lines).map(|definition| self.macros.define(definition));
        self.record(result)
    }

    pub fn macro_definition(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(name)
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Validate and append one function. Nothing is appended when validation fails.
    pub fn append(&mut self, input: FunctionInput) -> Result<()> {
        let context = ValidationContext {
            format: &self.format,
            apertures: &self.apertures,
            ignore_invalid: self.ignore_invalid,
        };
        let result = self.functions.append(input, &context);
        self.record(result)
    }

    /// Append from a loose key set, see [`FunctionOptions`] for which keys take precedence.
    pub fn append_options(&mut self, options: FunctionOptions) -> Result<()> {
        self.append(options.resolve())
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn function_at(&self, index: usize) -> Result<&Function> {
        let result = self.functions.get(index);
        self.record(result)
    }

    pub fn functions(&self) -> &[Function] {
        self.functions.as_slice()
    }

    /// The extent of all drawn and flashed material, in format units. `(0,0,0,0)` when nothing is drawn.
    pub fn bounding_box(&self) -> Result<BoundingBox> {
        let result = GeometryEngine::new(&self.format, &self.apertures, self.ignore_blank)
            .bounding_box(self.functions.as_slice());
        self.record(result)
    }

    pub fn width(&self) -> Result<f64> {
        self.bounding_box()
            .map(|bbox| bbox.width())
    }

    pub fn height(&self) -> Result<f64> {
        self.bounding_box()
            .map(|bbox| bbox.height())
    }

    /// Re-express this document in `target`'s format and unit, appending to whatever `target` already holds.
    ///
    /// `target` must have its digit widths configured. Apertures that reference a macro cannot be converted and
    /// fail with [`crate::DocumentError::UnsupportedConversion`]. On failure `target` is left partially populated
    /// and should be discarded.
    pub fn convert(&self, target: &mut GerberDocument) -> Result<()> {
        let result = convert::convert(self, target);
        self.record(result)
    }

    pub fn ignore_invalid(&self) -> bool {
        self.ignore_invalid
    }

    /// When set, unknown and deprecated codes and parameters are recorded verbatim and aperture selections are not
    /// checked against the aperture table.
    pub fn set_ignore_invalid(&mut self, ignore_invalid: bool) {
        self.ignore_invalid = ignore_invalid;
    }

    pub fn ignore_blank(&self) -> bool {
        self.ignore_blank
    }

    /// When set, apertures marked non-drawing are left out of the bounding box.
    pub fn set_ignore_blank(&mut self, ignore_blank: bool) {
        self.ignore_blank = ignore_blank;
    }
}
