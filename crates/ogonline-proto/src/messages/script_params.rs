//! Edits to script parameter sets.
//!
//! `param_id` names the object owning the parameter set; `INVALID_OBJECT_ID`
//! addresses the level's own parameters.

use crate::category::MessageCategory;
use crate::ids::{INVALID_OBJECT_ID, ObjectId};
use crate::messages::Message;
use crate::value::{FieldReader, Object};

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptParamString {
    pub param_id: ObjectId,
    pub key: String,
    pub value: String,
    pub editor_type: u8,
    pub editor_details: String,
}

impl Default for ScriptParamString {
    fn default() -> Self {
        Self {
            param_id: INVALID_OBJECT_ID,
            key: String::new(),
            value: String::new(),
            editor_type: 0,
            editor_details: String::new(),
        }
    }
}

impl Message for ScriptParamString {
    const CATEGORY: MessageCategory = MessageCategory::LevelPersistent;

    fn serialize(&self) -> Object {
        Object::new()
            .with("param_id", self.param_id)
            .with("key", self.key.as_str())
            .with("value", self.value.as_str())
            .with("editor_type", self.editor_type)
            .with("editor_details", self.editor_details.as_str())
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("param_id", &mut self.param_id);
        r.string("key", &mut self.key);
        r.string("value", &mut self.value);
        r.u8("editor_type", &mut self.editor_type);
        r.string("editor_details", &mut self.editor_details);
    }
}

/// Numeric payload of [`ScriptParamUnion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericParam {
    Int(i32),
    Float(f32),
}

impl Default for NumericParam {
    fn default() -> Self {
        NumericParam::Int(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptParamUnion {
    pub param_id: ObjectId,
    pub key: String,
    pub value: NumericParam,
    pub editor_type: u8,
    pub editor_details: String,
}

impl Default for ScriptParamUnion {
    fn default() -> Self {
        Self {
            param_id: INVALID_OBJECT_ID,
            key: String::new(),
            value: NumericParam::default(),
            editor_type: 0,
            editor_details: String::new(),
        }
    }
}

impl Message for ScriptParamUnion {
    const CATEGORY: MessageCategory = MessageCategory::LevelPersistent;

    fn serialize(&self) -> Object {
        let obj = Object::new()
            .with("param_id", self.param_id)
            .with("key", self.key.as_str());
        let obj = match self.value {
            NumericParam::Int(v) => obj.with("type", 0u8).with("value", v),
            NumericParam::Float(v) => obj.with("type", 1u8).with("value", v),
        };
        obj.with("editor_type", self.editor_type)
            .with("editor_details", self.editor_details.as_str())
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("param_id", &mut self.param_id);
        r.string("key", &mut self.key);
        let mut kind = 0u8;
        if r.u8("type", &mut kind) {
            match kind {
                0 => {
                    let mut v = 0i32;
                    if r.i32("value", &mut v) {
                        self.value = NumericParam::Int(v);
                    }
                }
                1 => {
                    let mut v = 0f32;
                    if r.f32("value", &mut v) {
                        self.value = NumericParam::Float(v);
                    }
                }
                _ => r.mark_invalid("type"),
            }
        }
        r.u8("editor_type", &mut self.editor_type);
        r.string("editor_details", &mut self.editor_details);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptParamRemove {
    pub param_id: ObjectId,
    pub key: String,
}

impl Default for ScriptParamRemove {
    fn default() -> Self {
        Self {
            param_id: INVALID_OBJECT_ID,
            key: String::new(),
        }
    }
}

impl Message for ScriptParamRemove {
    const CATEGORY: MessageCategory = MessageCategory::LevelPersistent;

    fn serialize(&self) -> Object {
        Object::new()
            .with("param_id", self.param_id)
            .with("key", self.key.as_str())
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("param_id", &mut self.param_id);
        r.string("key", &mut self.key);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptParamRename {
    pub param_id: ObjectId,
    pub key: String,
    pub new_key: String,
}

impl Default for ScriptParamRename {
    fn default() -> Self {
        Self {
            param_id: INVALID_OBJECT_ID,
            key: String::new(),
            new_key: String::new(),
        }
    }
}

impl Message for ScriptParamRename {
    const CATEGORY: MessageCategory = MessageCategory::LevelPersistent;

    fn serialize(&self) -> Object {
        Object::new()
            .with("param_id", self.param_id)
            .with("key", self.key.as_str())
            .with("new_key", self.new_key.as_str())
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("param_id", &mut self.param_id);
        r.string("key", &mut self.key);
        r.string("new_key", &mut self.new_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_numeric_kind() {
        let msg = ScriptParamUnion {
            param_id: 4,
            key: "Speed".into(),
            value: NumericParam::Float(1.5),
            editor_type: 2,
            editor_details: "0,10".into(),
        };
        let obj = msg.serialize();
        let mut back = ScriptParamUnion::default();
        let mut r = FieldReader::new(&obj);
        back.deserialize(&mut r);
        assert!(r.is_complete());
        assert_eq!(back, msg);
    }

    #[test]
    fn union_with_unknown_type_keeps_default_value() {
        let obj = Object::new()
            .with("param_id", 1i32)
            .with("key", "k")
            .with("type", 9u8)
            .with("value", 3i32);
        let mut back = ScriptParamUnion::default();
        let mut r = FieldReader::new(&obj);
        back.deserialize(&mut r);
        assert_eq!(back.value, NumericParam::Int(0));
        assert!(r.missing().contains(&"type"));
    }
}
