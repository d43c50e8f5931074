//! Conversion options and the resolved context shared by every converter.

use jiff::tz::TimeZone;

use crate::ConvertError;

/// How row mode renders numeric and temporal scalars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumericMode {
    /// Exact decimals and calendar values (`Decimal`, `Date`, `TimestampNtz`).
    #[default]
    Host,
    /// Plain numerics suited to columnar consumers: scaled FIXED as `Float`,
    /// DATE as `EpochDays`, TIMESTAMP_NTZ as `EpochNanos`.
    Columnar,
}

/// Shape of the rows produced by [`crate::RowIterator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RowShape {
    /// Values in schema order.
    #[default]
    Positional,
    /// `(field name, value)` pairs in schema order.
    Named,
}

/// User-facing conversion options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvertOptions {
    /// IANA time zone used for local timestamps; `None` means UTC.
    pub session_time_zone: Option<String>,
    /// Scalar rendering in row mode.
    pub numeric_mode: NumericMode,
    /// Table mode: rewrite scaled FIXED columns to `Decimal128` instead of `Float64`.
    pub number_to_decimal: bool,
    /// Row mode output shape.
    pub row_shape: RowShape,
}

impl ConvertOptions {
    /// Options with every default applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session time zone.
    #[must_use]
    pub fn with_session_time_zone(mut self, name: impl Into<String>) -> Self {
        self.session_time_zone = Some(name.into());
        self
    }

    /// Set the row-mode numeric rendering.
    #[must_use]
    pub fn with_numeric_mode(mut self, mode: NumericMode) -> Self {
        self.numeric_mode = mode;
        self
    }

    /// Choose `Decimal128` (true) or `Float64` (false) for scaled FIXED in table mode.
    #[must_use]
    pub fn with_number_to_decimal(mut self, enabled: bool) -> Self {
        self.number_to_decimal = enabled;
        self
    }

    /// Set the row-mode output shape.
    #[must_use]
    pub fn with_row_shape(mut self, shape: RowShape) -> Self {
        self.row_shape = shape;
        self
    }
}

/// Options resolved once and passed explicitly into converter construction.
#[derive(Debug, Clone)]
pub struct ConverterContext {
    options: ConvertOptions,
    session_tz: TimeZone,
}

impl ConverterContext {
    /// Resolve `options`, looking up the session time zone.
    ///
    /// # Errors
    /// Returns `ConvertError::Config` if the time zone name is unknown.
    pub fn new(options: &ConvertOptions) -> Result<Self, ConvertError> {
        let session_tz = match options.session_time_zone.as_deref() {
            None => TimeZone::UTC,
            Some(name) => TimeZone::get(name).map_err(|e| ConvertError::Config {
                message: format!("unknown session time zone '{name}': {e}"),
            })?,
        };
        Ok(Self {
            options: options.clone(),
            session_tz,
        })
    }

    /// The options this context was built from.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Time zone applied to local timestamps.
    pub fn session_tz(&self) -> &TimeZone {
        &self.session_tz
    }

    /// Time zone identifier attached to rewritten LTZ/TZ columns in table mode.
    pub(crate) fn session_tz_name(&self) -> Option<&str> {
        self.options.session_time_zone.as_deref()
    }

    pub(crate) fn numeric_mode(&self) -> NumericMode {
        self.options.numeric_mode
    }
}

impl Default for ConverterContext {
    fn default() -> Self {
        Self {
            options: ConvertOptions::default(),
            session_tz: TimeZone::UTC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_utc() {
        let ctx = ConverterContext::new(&ConvertOptions::new()).unwrap();
        assert_eq!(ctx.session_tz_name(), None);
        assert_eq!(ctx.numeric_mode(), NumericMode::Host);
        assert_eq!(ctx.options().row_shape, RowShape::Positional);
    }

    #[test]
    fn unknown_zone_is_config_error() {
        let opts = ConvertOptions::new().with_session_time_zone("Mars/Olympus_Mons");
        let err = ConverterContext::new(&opts).unwrap_err();
        assert!(matches!(err, ConvertError::Config { .. }));
    }

    #[test]
    fn builder_setters() {
        let opts = ConvertOptions::new()
            .with_numeric_mode(NumericMode::Columnar)
            .with_number_to_decimal(true)
            .with_row_shape(RowShape::Named);
        assert!(opts.number_to_decimal);
        assert_eq!(opts.numeric_mode, NumericMode::Columnar);
        assert_eq!(opts.row_shape, RowShape::Named);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_deserialize_with_defaults() {
        let opts: ConvertOptions =
            serde_json::from_str(r#"{"session_time_zone":"Europe/Berlin","row_shape":"Named"}"#)
                .unwrap();
        assert_eq!(opts.session_time_zone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(opts.row_shape, RowShape::Named);
        assert_eq!(opts.numeric_mode, NumericMode::Host);
        assert!(!opts.number_to_decimal);
    }
}
