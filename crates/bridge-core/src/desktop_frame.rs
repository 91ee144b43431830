use std::collections::HashMap;

/// The engine's per-frame output. Only `(name, value)` pairs in
/// `parameters` cross the wire to the Desktop Client; the diagnostic maps
/// are for observers (UI, logging) only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DesktopFrame {
    pub face_present: bool,
    /// `(parameter_name, value, weight)`. Weight is currently always `1.0`
    /// — the data model leaves room for future blending, not used here.
    pub parameters: Vec<(String, f64, f64)>,
    pub expressions: HashMap<String, String>,
    pub interpolations: HashMap<String, String>,
    /// `(min_seen, max_seen, has_samples)` per rule.
    pub extremums: HashMap<String, (f64, f64, bool)>,
}

impl DesktopFrame {
    pub fn face_lost() -> Self {
        Self {
            face_present: false,
            ..Default::default()
        }
    }
}
