//! The block catalog.
//!
//! A fixed, table-driven registry of every block kind a program may use:
//! display metadata for the editor palette, typed input slots with their
//! defaults, and the command template each statement block expands to. Pure
//! data plus pure lookups; registration is validated once and the catalog is
//! immutable afterwards.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::color::Color;
use crate::command::{Command, Value};

/// The type a slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Number,
    Color,
    Boolean,
}

impl SlotType {
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (SlotType::Number, Value::Number(_))
                | (SlotType::Color, Value::Color(_))
                | (SlotType::Boolean, Value::Bool(_))
        )
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotType::Number => "number",
            SlotType::Color => "color",
            SlotType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// One named input position on a block.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSpec {
    pub name: &'static str,
    pub ty: SlotType,
    /// Used when the slot is left unconnected. A slot without a default
    /// makes the whole block unusable while empty (it is skipped with a
    /// diagnostic rather than emitting a short command).
    pub default: Option<Value>,
}

impl SlotSpec {
    pub fn number(name: &'static str, default: f32) -> Self {
        Self {
            name,
            ty: SlotType::Number,
            default: Some(Value::Number(default)),
        }
    }

    pub fn color(name: &'static str, default: Color) -> Self {
        Self {
            name,
            ty: SlotType::Color,
            default: Some(Value::Color(default)),
        }
    }
}

/// One argument position in a command template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateArg {
    /// Substituted with the named slot's resolved value.
    Slot(&'static str),
    /// A fixed literal baked into the template.
    Const(Value),
}

/// The command a statement block expands to.
#[derive(Debug, Clone, Serialize)]
pub struct CommandTemplate {
    pub name: &'static str,
    pub args: Vec<TemplateArg>,
}

impl CommandTemplate {
    pub fn new(name: &'static str, args: Vec<TemplateArg>) -> Self {
        Self { name, args }
    }

    /// Expand the template with resolved slot values, in slot order.
    ///
    /// `resolved` maps slot name to value; callers guarantee every slot the
    /// template references is present (registration validates the names).
    pub fn expand(&self, resolved: &HashMap<&str, Value>) -> Command {
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                TemplateArg::Slot(name) => resolved[name],
                TemplateArg::Const(value) => *value,
            })
            .collect();
        Command::new(self.name, args)
    }
}

/// Whether a block is a statement (chainable, emits a command) or a value
/// (plugs into a slot, produces a literal).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockRole {
    Statement { template: CommandTemplate },
    Value,
}

/// Palette category, with the editor's display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Movement,
    Scene,
    Timing,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Movement => "Movement",
            Category::Scene => "Scene",
            Category::Timing => "Timing",
        }
    }

    pub fn colour(&self) -> &'static str {
        match self {
            Category::Movement => "#5CA65C",
            Category::Scene => "#5C6CA6",
            Category::Timing => "#5C68A6",
        }
    }
}

/// A complete block definition.
#[derive(Debug, Clone, Serialize)]
pub struct BlockSpec {
    pub kind: &'static str,
    /// Palette label shown next to the block.
    pub label: &'static str,
    pub category: Category,
    pub role: BlockRole,
    /// Declared slots, in resolution and display order.
    pub slots: Vec<SlotSpec>,
}

impl BlockSpec {
    pub fn slot(&self, name: &str) -> Option<&SlotSpec> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn is_value(&self) -> bool {
        matches!(self.role, BlockRole::Value)
    }
}

/// A catalog entry is misconfigured. Fatal at startup, never at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    DuplicateKind {
        kind: String,
    },
    /// A command template names a slot the block does not declare.
    UnknownTemplateSlot {
        kind: String,
        slot: String,
    },
    /// Value blocks produce exactly one output and so declare exactly one slot.
    ValueSlotCount {
        kind: String,
        count: usize,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::DuplicateKind { kind } => {
                write!(f, "duplicate block kind {kind:?}")
            }
            CatalogError::UnknownTemplateSlot { kind, slot } => {
                write!(f, "block {kind:?} template references undeclared slot {slot:?}")
            }
            CatalogError::ValueSlotCount { kind, count } => {
                write!(f, "value block {kind:?} declares {count} slots, expected 1")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// The block registry. Built once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    blocks: HashMap<&'static str, BlockSpec>,
    /// Registration order, for stable listings.
    order: Vec<&'static str>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: BlockSpec) -> Result<(), CatalogError> {
        if self.blocks.contains_key(spec.kind) {
            return Err(CatalogError::DuplicateKind {
                kind: spec.kind.to_string(),
            });
        }

        match &spec.role {
            BlockRole::Statement { template } => {
                for arg in &template.args {
                    if let TemplateArg::Slot(name) = arg {
                        if spec.slot(name).is_none() {
                            return Err(CatalogError::UnknownTemplateSlot {
                                kind: spec.kind.to_string(),
                                slot: name.to_string(),
                            });
                        }
                    }
                }
            }
            BlockRole::Value => {
                if spec.slots.len() != 1 {
                    return Err(CatalogError::ValueSlotCount {
                        kind: spec.kind.to_string(),
                        count: spec.slots.len(),
                    });
                }
            }
        }

        self.order.push(spec.kind);
        self.blocks.insert(spec.kind, spec);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&BlockSpec> {
        self.blocks.get(kind)
    }

    /// All entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockSpec> {
        self.order.iter().filter_map(|kind| self.blocks.get(kind))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The built-in block set.
    pub fn builtin() -> Result<Self, CatalogError> {
        use BlockRole::{Statement, Value as ValueRole};
        use TemplateArg::Slot;

        let mut catalog = Self::new();

        let statement = |kind, label, category, slots, template| BlockSpec {
            kind,
            label,
            category,
            role: Statement { template },
            slots,
        };

        // Movement
        catalog.register(statement(
            "move_forward",
            "move forward",
            Category::Movement,
            vec![SlotSpec::number("distance", 1.0)],
            CommandTemplate::new("moveForward", vec![Slot("distance")]),
        ))?;
        catalog.register(statement(
            "move_backward",
            "move backward",
            Category::Movement,
            vec![SlotSpec::number("distance", 1.0)],
            CommandTemplate::new("moveBackward", vec![Slot("distance")]),
        ))?;
        catalog.register(statement(
            "turn_left",
            "turn left",
            Category::Movement,
            vec![],
            CommandTemplate::new("turnLeft", vec![]),
        ))?;
        catalog.register(statement(
            "turn_right",
            "turn right",
            Category::Movement,
            vec![],
            CommandTemplate::new("turnRight", vec![]),
        ))?;
        catalog.register(statement(
            "move_distance",
            "move ___ units",
            Category::Movement,
            vec![SlotSpec::number("distance", 1.0)],
            CommandTemplate::new("moveForward", vec![Slot("distance")]),
        ))?;
        catalog.register(statement(
            "turn_degrees",
            "turn ___ degrees",
            Category::Movement,
            vec![SlotSpec::number("degrees", 90.0)],
            CommandTemplate::new("turnDegrees", vec![Slot("degrees")]),
        ))?;

        // Scene
        catalog.register(statement(
            "set_camera_position",
            "set camera position x y z",
            Category::Scene,
            vec![
                SlotSpec::number("x", 0.0),
                SlotSpec::number("y", 0.0),
                SlotSpec::number("z", 0.0),
            ],
            CommandTemplate::new("setCameraPosition", vec![Slot("x"), Slot("y"), Slot("z")]),
        ))?;
        catalog.register(statement(
            "set_camera_look_at",
            "set camera to look at x y z",
            Category::Scene,
            vec![
                SlotSpec::number("x", 0.0),
                SlotSpec::number("y", 0.0),
                SlotSpec::number("z", 0.0),
            ],
            CommandTemplate::new("setCameraLookAt", vec![Slot("x"), Slot("y"), Slot("z")]),
        ))?;
        catalog.register(statement(
            "set_light_color",
            "set light color to",
            Category::Scene,
            vec![SlotSpec::color("color", Color::WHITE)],
            CommandTemplate::new("setLightColor", vec![Slot("color")]),
        ))?;
        catalog.register(statement(
            "set_light_intensity",
            "set light intensity to",
            Category::Scene,
            vec![SlotSpec::number("intensity", 1.0)],
            CommandTemplate::new("setLightIntensity", vec![Slot("intensity")]),
        ))?;
        catalog.register(statement(
            "set_ground_color",
            "set ground color to",
            Category::Scene,
            vec![SlotSpec::color("color", Color::from_rgb8(0x80, 0x80, 0x80))],
            CommandTemplate::new("setGroundColor", vec![Slot("color")]),
        ))?;
        catalog.register(statement(
            "set_ground_size",
            "set ground size to",
            Category::Scene,
            vec![SlotSpec::number("size", 1.0)],
            CommandTemplate::new("setGroundSize", vec![Slot("size")]),
        ))?;
        catalog.register(statement(
            "set_background",
            "set background color to",
            Category::Scene,
            vec![SlotSpec::color("color", Color::WHITE)],
            CommandTemplate::new("setBackground", vec![Slot("color")]),
        ))?;

        // Timing
        catalog.register(statement(
            "wait_seconds",
            "wait ___ seconds",
            Category::Timing,
            vec![SlotSpec::number("seconds", 1.0)],
            CommandTemplate::new("wait", vec![Slot("seconds")]),
        ))?;
        catalog.register(statement(
            "reset_scene",
            "reset the scene",
            Category::Timing,
            vec![],
            CommandTemplate::new("resetScene", vec![]),
        ))?;

        // Value blocks
        catalog.register(BlockSpec {
            kind: "color_picker",
            label: "color",
            category: Category::Scene,
            role: ValueRole,
            slots: vec![SlotSpec::color("colour", Color::WHITE)],
        })?;
        catalog.register(BlockSpec {
            kind: "number",
            label: "number",
            category: Category::Movement,
            role: ValueRole,
            slots: vec![SlotSpec::number("value", 0.0)],
        })?;

        Ok(catalog)
    }
}
