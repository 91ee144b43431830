use std::collections::HashMap;

/// A single timestamped face-tracking sample from the mobile source.
///
/// Keys in `blend_shapes` are source-defined and opaque to the engine
/// except as variable bindings; they are looked up case-sensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub timestamp: f64,
    pub face_present: bool,
    pub head_position: (f64, f64, f64),
    pub head_rotation: (f64, f64, f64),
    pub eye_left: (f64, f64),
    pub eye_right: (f64, f64),
    pub blend_shapes: HashMap<String, f64>,
}

impl Frame {
    /// Bind every frame scalar and blend-shape key into a lookup table
    /// keyed the same way rule expressions reference them.
    pub fn variable_bindings(&self) -> HashMap<String, f64> {
        let mut vars = HashMap::with_capacity(self.blend_shapes.len() + 10);
        vars.insert("HeadPosX".to_string(), self.head_position.0);
        vars.insert("HeadPosY".to_string(), self.head_position.1);
        vars.insert("HeadPosZ".to_string(), self.head_position.2);
        vars.insert("HeadRotX".to_string(), self.head_rotation.0);
        vars.insert("HeadRotY".to_string(), self.head_rotation.1);
        vars.insert("HeadRotZ".to_string(), self.head_rotation.2);
        vars.insert("EyeLeftX".to_string(), self.eye_left.0);
        vars.insert("EyeLeftY".to_string(), self.eye_left.1);
        vars.insert("EyeRightX".to_string(), self.eye_right.0);
        vars.insert("EyeRightY".to_string(), self.eye_right.1);
        for (k, v) in &self.blend_shapes {
            vars.insert(k.clone(), *v);
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_bindings_include_scalars_and_blend_shapes() {
        let mut blend_shapes = HashMap::new();
        blend_shapes.insert("JawOpen".to_string(), 0.4);
        let frame = Frame {
            timestamp: 0.0,
            face_present: true,
            head_position: (1.0, 2.0, 3.0),
            head_rotation: (10.0, 20.0, 30.0),
            eye_left: (0.1, 0.2),
            eye_right: (0.3, 0.4),
            blend_shapes,
        };
        let vars = frame.variable_bindings();
        assert_eq!(vars["HeadRotX"], 10.0);
        assert_eq!(vars["JawOpen"], 0.4);
    }
}
