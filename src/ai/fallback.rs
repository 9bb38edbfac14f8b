/// Canned tips used when the fix-it endpoint cannot be reached, in match order.
const TIPS: &[(&str, &str)] = &[
    ("Cannot read", "Use: obj?.property or check if obj exists"),
    ("undefined", "Initialize variable: let x = value;"),
    ("NullInjector", "Add service to providers array in module"),
    ("TypeError", "Check variable types before operations"),
];

pub const GENERIC_TIP: &str = "Review error in browser console";

pub fn compute_fallback(error: &str) -> String {
    TIPS.iter()
        .find(|(needle, _)| error.contains(*needle))
        .map(|(_, tip)| *tip)
        .unwrap_or(GENERIC_TIP)
        .to_string()
}
