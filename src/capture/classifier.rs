use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Known error families worth escalating, in match order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFamily {
    /// Numbered framework error codes such as `NG0100`.
    FrameworkCode,
    ExpressionChanged,
    NullAccess,
    UndefinedAccess,
    MissingProvider,
    TypeError,
    ReferenceError,
}

impl fmt::Display for ErrorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameworkCode => write!(f, "framework_code"),
            Self::ExpressionChanged => write!(f, "expression_changed"),
            Self::NullAccess => write!(f, "null_access"),
            Self::UndefinedAccess => write!(f, "undefined_access"),
            Self::MissingProvider => write!(f, "missing_provider"),
            Self::TypeError => write!(f, "type_error"),
            Self::ReferenceError => write!(f, "reference_error"),
        }
    }
}

const PATTERNS: &[(ErrorFamily, &str)] = &[
    (ErrorFamily::FrameworkCode, r"NG\d{4}"),
    (ErrorFamily::ExpressionChanged, r"ExpressionChanged"),
    (ErrorFamily::NullAccess, r"Cannot read propert(?:y|ies)"),
    (ErrorFamily::UndefinedAccess, r"undefined is not"),
    (ErrorFamily::MissingProvider, r"NullInjectorError"),
    (ErrorFamily::TypeError, r"TypeError"),
    (ErrorFamily::ReferenceError, r"ReferenceError"),
];

fn patterns() -> &'static [(ErrorFamily, Regex)] {
    static COMPILED: OnceLock<Vec<(ErrorFamily, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(family, pattern)| Regex::new(pattern).ok().map(|re| (*family, re)))
            .collect()
    })
}

/// First family whose signature appears in `message`.
pub fn matched_family(message: &str) -> Option<ErrorFamily> {
    if message.trim().is_empty() {
        return None;
    }
    patterns()
        .iter()
        .find(|(_, re)| re.is_match(message))
        .map(|(family, _)| *family)
}

pub fn is_framework_error(message: &str) -> bool {
    matched_family(message).is_some()
}
