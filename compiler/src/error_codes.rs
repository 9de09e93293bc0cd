//! Global Error Code Registry for the phs front end
//!
//! Every diagnostic the resolution engine emits at `error` or `abort`
//! severity carries a stable code from this registry. Codes are grouped by
//! range so later phases can claim their own block without collisions.
//!
//! # Error Code Ranges
//!
//! - E2000-E2999: Symbol resolution and scope errors
//! - E4000-E4999: Source loading and require errors (reserved)
//! - E9000-E9999: Internal engine errors
//!
//! # Subcategory Organization
//!
//! Within E2xxx the hundreds digit selects the subcategory:
//! - 0: Lookup failures
//! - 1: Access and visibility errors
//! - 2: Declaration conflicts
//! - 3: Inheritance and contract errors
//! - 4: Context errors (`this`, `self`, `super`)
//! - 5: Compile-time constant errors
//! - 9: Engine invariant violations

use std::collections::HashMap;
use std::fmt;

/// Error code struct containing the numeric code and human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// The numeric error code (e.g., 2001)
    pub code: u16,
    /// Human-readable error category
    pub category: &'static str,
    /// Brief description of what this error means
    pub description: &'static str,
    /// Optional help text with suggestions for fixing the error
    pub help: Option<&'static str>,
}

impl ErrorCode {
    pub const fn new(
        code: u16,
        category: &'static str,
        description: &'static str,
        help: Option<&'static str>,
    ) -> Self {
        Self {
            code,
            category,
            description,
            help,
        }
    }

    /// Format the error code as "E{code:04}" (e.g., "E2001")
    pub fn format_code(&self) -> String {
        format!("E{:04}", self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.format_code(),
            self.category,
            self.description
        )
    }
}

/// Registry containing all defined error codes
pub struct ErrorCodeRegistry {
    codes: HashMap<u16, ErrorCode>,
}

impl ErrorCodeRegistry {
    /// Create a new registry with all predefined error codes
    pub fn new() -> Self {
        let mut registry = Self {
            codes: HashMap::new(),
        };
        registry.register_all_codes();
        registry
    }

    pub fn get(&self, code: u16) -> Option<&ErrorCode> {
        self.codes.get(&code)
    }

    /// Get an error code by its formatted string (e.g., "E2001")
    pub fn get_by_string(&self, code_str: &str) -> Option<&ErrorCode> {
        let code_num = code_str.strip_prefix('E')?.parse::<u16>().ok()?;
        self.get(code_num)
    }

    fn register(&mut self, error_code: ErrorCode) {
        self.codes.insert(error_code.code, error_code);
    }

    fn register_all_codes(&mut self) {
        // ===== SYMBOL RESOLUTION ERRORS (E2000-E2999) =====

        // Lookup failures (E2000-E2099)
        self.register(ErrorCode::new(
            2001,
            "Symbol",
            "Undefined symbol",
            Some("Check that the identifier is declared and in scope"),
        ));
        self.register(ErrorCode::new(
            2002,
            "Symbol",
            "Symbol already defined",
            Some("Choose a different name or remove the duplicate declaration"),
        ));
        self.register(ErrorCode::new(
            2003,
            "Symbol",
            "Symbol used before its declaration",
            Some("Move the declaration above its first use"),
        ));
        self.register(ErrorCode::new(
            2004,
            "Symbol",
            "Name resolution failed",
            Some("Break the import cycle or shorten the chain of `use` aliases"),
        ));

        // Access and visibility errors (E2100-E2199)
        self.register(ErrorCode::new(
            2101,
            "Access",
            "Private symbol access",
            Some("Private symbols can only be accessed within their defining class, trait or module"),
        ));
        self.register(ErrorCode::new(
            2102,
            "Access",
            "Restricted symbol access",
            Some("Members of the class are unavailable while its super constructor arguments are evaluated"),
        ));

        // Declaration conflicts (E2200-E2299)
        self.register(ErrorCode::new(
            2201,
            "Declaration",
            "Final symbol redeclared",
            Some("Final and intrinsic symbols cannot be redeclared or overridden"),
        ));
        self.register(ErrorCode::new(
            2202,
            "Declaration",
            "Constant redeclared or reassigned",
            Some("Constants are bound once per scope"),
        ));
        self.register(ErrorCode::new(
            2203,
            "Declaration",
            "Incompatible refinement of an incomplete declaration",
            Some("The complete declaration must have the same kind and modifiers as the forward declaration"),
        ));

        // Inheritance and contract errors (E2300-E2399)
        self.register(ErrorCode::new(
            2301,
            "Inheritance",
            "Cyclic or missing superclass",
            Some("A class must extend an existing class and must not extend itself transitively"),
        ));
        self.register(ErrorCode::new(
            2302,
            "Inheritance",
            "Interface contract violation",
            Some("Implementations must match the abstract member's parameters and must not narrow its visibility"),
        ));
        self.register(ErrorCode::new(
            2303,
            "Inheritance",
            "Invalid instantiation",
            Some("Only concrete (non-abstract) classes can be instantiated"),
        ));

        // Context errors (E2400-E2499)
        self.register(ErrorCode::new(
            2401,
            "Context",
            "Invalid context",
            Some("`this`, `self` and `super` are only meaningful inside the members of a class"),
        ));

        // Compile-time constant errors (E2500-E2599)
        self.register(ErrorCode::new(
            2501,
            "Constant",
            "Require path is not a constant string",
            Some("The path of a `require` must reduce to a string at compile time"),
        ));

        // Engine invariant violations (E2900-E2999)
        self.register(ErrorCode::new(
            2901,
            "Engine",
            "Resolution engine invariant violated",
            Some("This is an internal error; analysis of the unit was aborted"),
        ));

        // ===== INTERNAL ERRORS (E9000-E9999) =====
        self.register(ErrorCode::new(
            9999,
            "Internal",
            "Unknown error",
            Some("An unexpected error occurred; please report it with context"),
        ));
    }

    /// Get all error codes in a specific range, sorted
    pub fn get_range(&self, start: u16, end: u16) -> Vec<&ErrorCode> {
        let mut codes: Vec<&ErrorCode> = self
            .codes
            .values()
            .filter(|code| code.code >= start && code.code <= end)
            .collect();
        codes.sort_by_key(|code| code.code);
        codes
    }

    /// Get all symbol resolution error codes (E2000-E2999)
    pub fn get_symbol_errors(&self) -> Vec<&ErrorCode> {
        self.get_range(2000, 2999)
    }

    pub fn is_valid_code(&self, code: u16) -> bool {
        self.codes.contains_key(&code)
    }
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: std::sync::OnceLock<ErrorCodeRegistry> = std::sync::OnceLock::new();

/// Get the global error code registry
pub fn error_registry() -> &'static ErrorCodeRegistry {
    REGISTRY.get_or_init(ErrorCodeRegistry::new)
}

pub fn get_error_code(code: u16) -> Option<&'static ErrorCode> {
    error_registry().get(code)
}

/// Format an error code as a string (e.g., 2001 -> "E2001")
pub fn format_error_code(code: u16) -> String {
    format!("E{:04}", code)
}

/// Parse an error code string (e.g., "E2001" -> Some(2001))
pub fn parse_error_code(code_str: &str) -> Option<u16> {
    code_str.strip_prefix('E')?.parse::<u16>().ok()
}
