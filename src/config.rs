// Configuration layer: `Config` for `parse`, `UnparseConfig` for `unparse`,
// and the mutable library-level `Defaults` settings.
//
// Grounded on the teacher's `Separators`/`Escape`/`Newlines` decode layer
// (`anonsourabh-RustyCSV`'s `core::newlines::Newlines`), generalised from
// "decode an Erlang term into a parser setting" to "hold a validated Rust
// struct" since there is no longer a term boundary to decode across.

use std::sync::{Arc, RwLock};

use crate::core::Newlines;
use crate::model::FieldKey;

/// Single bytes that may never appear in a configured delimiter (parse or
/// unparse side): CR, LF, the default quote character. The BOM is a
/// 3-byte UTF-8 sequence, not a single byte, so it's checked separately
/// via `BOM_UTF8_BYTES` — see `contains_bad_delimiter_bytes`.
pub const BAD_DELIMITERS: &[u8] = &[b'\r', b'\n', b'"'];

/// U+FEFF, the byte-order mark.
pub const BYTE_ORDER_MARK: char = '\u{FEFF}';
/// `BYTE_ORDER_MARK` encoded as UTF-8: `EF BB BF`.
pub const BOM_UTF8_BYTES: [u8; 3] = [0xEF, 0xBB, 0xBF];
pub const RECORD_SEP: u8 = 0x1E;
pub const UNIT_SEP: u8 = 0x1F;

/// spec.md §6's full `BAD_DELIMITERS = {CR, LF, '"', BOM}` check: any of
/// the single bad bytes, or the BOM's 3-byte UTF-8 sequence, appearing
/// anywhere in `delimiter`.
pub fn contains_bad_delimiter_bytes(delimiter: &[u8]) -> bool {
    delimiter.iter().any(|b| BAD_DELIMITERS.contains(b))
        || delimiter
            .windows(BOM_UTF8_BYTES.len())
            .any(|w| w == BOM_UTF8_BYTES)
}

/// Candidate delimiters tried during delimiter guessing, in the default
/// order the heuristic scans them.
pub const DEFAULT_DELIMITERS_TO_GUESS: &[u8] = &[b',', b'\t', b'|', b';', RECORD_SEP, UNIT_SEP];

/// How a byte source's text encoding should be interpreted before parsing.
/// Most inputs are already UTF-8; Latin-1 is the one legacy encoding this
/// crate decodes on the way in (symmetric with `unparse::EncodingTarget`
/// on the way out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl InputEncoding {
    /// Decode raw bytes to a UTF-8 `String` per this encoding. UTF-8 input
    /// that isn't valid UTF-8 is decoded lossily rather than rejected —
    /// the parser is forgiving by design.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            InputEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            InputEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// `false` / `true` (meaning `#`) / an explicit string prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comments {
    Disabled,
    Default,
    Custom(Vec<u8>),
}

impl Comments {
    /// Resolve to the effective byte prefix, honoring the silent-disable
    /// rule when it collides with the delimiter.
    pub fn resolve(&self, delimiter: u8) -> Option<Vec<u8>> {
        let prefix = match self {
            Comments::Disabled => return None,
            Comments::Default => vec![b'#'],
            Comments::Custom(p) => {
                if p.is_empty() {
                    return None;
                }
                p.clone()
            }
        };
        if prefix.len() == 1 && prefix[0] == delimiter {
            return None;
        }
        Some(prefix)
    }
}

/// `false` / `true` / `"greedy"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipEmptyLines {
    #[default]
    False,
    True,
    Greedy,
}

/// `dynamicTyping`: disabled, blanket-enabled, per-field, or predicate-driven.
#[derive(Clone, Default)]
pub enum DynamicTyping {
    #[default]
    Disabled,
    Enabled,
    PerField(std::collections::HashMap<FieldKey, bool>),
    Predicate(Arc<dyn Fn(&str, &FieldKey) -> bool + Send + Sync>),
}

impl std::fmt::Debug for DynamicTyping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DynamicTyping::Disabled => write!(f, "Disabled"),
            DynamicTyping::Enabled => write!(f, "Enabled"),
            DynamicTyping::PerField(m) => write!(f, "PerField({m:?})"),
            DynamicTyping::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

impl DynamicTyping {
    pub fn enabled_for(&self, key: &FieldKey) -> bool {
        match self {
            DynamicTyping::Disabled => false,
            DynamicTyping::Enabled => true,
            DynamicTyping::PerField(m) => m.get(key).copied().unwrap_or(false),
            DynamicTyping::Predicate(_) => true, // predicate itself consulted with value text
        }
    }
}

pub type TransformHeaderFn = Arc<dyn Fn(&str, usize) -> String + Send + Sync>;
pub type TransformFn = Arc<dyn Fn(&str, &FieldKey) -> String + Send + Sync>;

/// Configuration accepted by `parse` / `parse_str`. Immutable once built —
/// a parse call never mutates its own `Config`.
#[derive(Clone)]
pub struct Config {
    /// `None` means "auto-detect". A multi-character delimiter is rejected
    /// at construction time, defaulting to `,` (the parse-side Open
    /// Question resolution).
    pub delimiter: Option<u8>,
    /// `None` means "auto-detect".
    pub newline: Option<Newlines>,
    pub quote_char: u8,
    pub escape_char: u8,
    pub header: bool,
    pub transform_header: Option<TransformHeaderFn>,
    pub dynamic_typing: DynamicTyping,
    pub transform: Option<TransformFn>,
    pub comments: Comments,
    pub skip_empty_lines: SkipEmptyLines,
    pub skip_first_n_lines: usize,
    /// 0 means unlimited.
    pub preview: usize,
    /// `None` means auto-enable when no quote char is found in the window.
    pub fast_mode: Option<bool>,
    /// 0 means "use the transport default" (`Defaults::local_chunk_size` /
    /// `Defaults::remote_chunk_size`).
    pub chunk_size: usize,
    pub delimiters_to_guess: Vec<u8>,
    pub encoding: InputEncoding,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            delimiter: None,
            newline: None,
            quote_char: b'"',
            escape_char: b'"',
            header: false,
            transform_header: None,
            dynamic_typing: DynamicTyping::Disabled,
            transform: None,
            comments: Comments::Disabled,
            skip_empty_lines: SkipEmptyLines::False,
            skip_first_n_lines: 0,
            preview: 0,
            fast_mode: None,
            chunk_size: 0,
            delimiters_to_guess: DEFAULT_DELIMITERS_TO_GUESS.to_vec(),
            encoding: InputEncoding::Utf8,
        }
    }
}

impl Config {
    /// Apply the parse-side delimiter invariants: `quoteChar != delimiter`,
    /// comment prefix colliding with delimiter silently disables comments,
    /// and reject a multi-byte delimiter (not representable in this field)
    /// by falling back to `None` (auto-detect, which always yields `,` on
    /// failure).
    pub fn normalized(mut self) -> Self {
        if let Some(d) = self.delimiter {
            if d == self.quote_char {
                self.delimiter = None;
            }
        }
        self
    }
}

/// A field value or predicate governing whether a column gets quoted.
#[derive(Clone)]
pub enum Quoting {
    All(bool),
    Predicate(Arc<dyn Fn(&str, usize) -> bool + Send + Sync>),
    PerColumn(Vec<bool>),
}

impl std::fmt::Debug for Quoting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quoting::All(b) => write!(f, "All({b})"),
            Quoting::Predicate(_) => write!(f, "Predicate(..)"),
            Quoting::PerColumn(v) => write!(f, "PerColumn({v:?})"),
        }
    }
}

impl Default for Quoting {
    fn default() -> Self {
        Quoting::All(false)
    }
}

/// `escapeFormulae`: disabled, the default trigger set, or a custom one.
#[derive(Debug, Clone)]
pub enum FormulaEscape {
    Disabled,
    Default,
    Custom(Vec<u8>),
}

impl Default for FormulaEscape {
    fn default() -> Self {
        FormulaEscape::Disabled
    }
}

/// The default formula-injection trigger bytes: `=`, `+`, `-`, `@`, TAB, CR.
pub const DEFAULT_FORMULA_TRIGGERS: &[u8] = &[b'=', b'+', b'-', b'@', b'\t', b'\r'];

impl FormulaEscape {
    pub fn triggers(&self) -> Option<&[u8]> {
        match self {
            FormulaEscape::Disabled => None,
            FormulaEscape::Default => Some(DEFAULT_FORMULA_TRIGGERS),
            FormulaEscape::Custom(v) => Some(v),
        }
    }
}

/// Configuration accepted by `unparse`.
#[derive(Debug, Clone, Default)]
pub struct UnparseConfig {
    pub quotes: Quoting,
    pub quote_char: u8,
    pub escape_char: u8,
    /// Serialization allows a multi-byte delimiter explicitly (the
    /// Open Question resolution's serialize-side carve-out).
    pub delimiter: Vec<u8>,
    pub newline: Vec<u8>,
    pub header: bool,
    /// Explicit column order. An empty, explicitly-set sequence is a
    /// `ConfigError::EmptyColumns`; `None` means "derive from input".
    pub columns: Option<Vec<String>>,
    pub skip_empty_lines: SkipEmptyLines,
    pub escape_formulae: FormulaEscape,
}

impl UnparseConfig {
    pub fn new() -> Self {
        UnparseConfig {
            quotes: Quoting::All(false),
            quote_char: b'"',
            escape_char: b'"',
            delimiter: vec![b','],
            newline: b"\r\n".to_vec(),
            header: true,
            columns: None,
            skip_empty_lines: SkipEmptyLines::False,
            escape_formulae: FormulaEscape::Disabled,
        }
    }

    /// §4.6: a configured delimiter containing a `BAD_DELIMITERS` byte
    /// (or the BOM) is rejected and the default `,` used instead.
    pub fn effective_delimiter(&self) -> &[u8] {
        if self.delimiter.is_empty() || contains_bad_delimiter_bytes(&self.delimiter) {
            b","
        } else {
            &self.delimiter
        }
    }
}

/// Mutable library-level defaults, runtime-adjustable and snapshotted at
/// the start of each parse (per the teacher's `StreamingParserResource`'s
/// `Mutex`-guarded shared state, generalised to a `RwLock` since these are
/// read far more often than written).
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    pub local_chunk_size: usize,
    pub remote_chunk_size: usize,
    pub default_delimiter: u8,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            local_chunk_size: 10 * 1024 * 1024,
            remote_chunk_size: 5 * 1024 * 1024,
            default_delimiter: b',',
        }
    }
}

static DEFAULTS: RwLock<Defaults> = RwLock::new(Defaults {
    local_chunk_size: 10 * 1024 * 1024,
    remote_chunk_size: 5 * 1024 * 1024,
    default_delimiter: b',',
});

/// Snapshot the current library-level defaults. A poisoned lock (some
/// earlier writer panicked mid-update) still yields the last-written
/// value rather than panicking again here.
pub fn defaults() -> Defaults {
    *DEFAULTS.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Overwrite the library-level defaults. Affects only parses started
/// after this call; in-flight parses already snapshotted their copy.
pub fn set_defaults(new_defaults: Defaults) {
    *DEFAULTS.write().unwrap_or_else(std::sync::PoisonError::into_inner) = new_defaults;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_disabled_on_delimiter_collision() {
        let c = Comments::Custom(vec![b',']);
        assert_eq!(c.resolve(b','), None);
    }

    #[test]
    fn comments_default_is_hash() {
        assert_eq!(Comments::Default.resolve(b',').unwrap(), vec![b'#']);
    }

    #[test]
    fn config_rejects_quote_as_delimiter() {
        let cfg = Config {
            delimiter: Some(b'"'),
            ..Config::default()
        }
        .normalized();
        assert_eq!(cfg.delimiter, None);
    }

    #[test]
    fn unparse_effective_delimiter_rejects_bad_bytes() {
        let mut cfg = UnparseConfig::new();
        cfg.delimiter = vec![b'\n'];
        assert_eq!(cfg.effective_delimiter(), b",");
    }

    #[test]
    fn unparse_effective_delimiter_rejects_bom() {
        let mut cfg = UnparseConfig::new();
        cfg.delimiter = BOM_UTF8_BYTES.to_vec();
        assert_eq!(cfg.effective_delimiter(), b",");
    }

    #[test]
    fn defaults_roundtrip() {
        let original = defaults();
        set_defaults(Defaults {
            local_chunk_size: 123,
            ..original
        });
        assert_eq!(defaults().local_chunk_size, 123);
        set_defaults(original);
    }
}
