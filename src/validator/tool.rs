//! Named tool-call schemas and the registry a [`super::StreamingValidator`]
//! checks calls against (spec §4.8 "ToolRegistry").

use std::collections::HashMap;

use crate::schema::FieldDef;

/// One tool's flat call-argument schema: a named list of typed, optionally
/// constrained args. Reuses [`FieldDef`]/[`crate::schema::Constraints`]
/// rather than a bespoke arg type — a tool-call argument and a struct field
/// are the same shape (name, type, required-ness, min/max/pattern/length),
/// so there is nothing a second type would add.
#[derive(Debug, Clone)]
pub struct ToolSchema {
	pub name: String,
	pub args: Vec<FieldDef>,
}

impl ToolSchema {
	pub fn new(name: impl Into<String>, args: Vec<FieldDef>) -> Self {
		Self { name: name.into(), args }
	}

	pub fn arg(&self, name: &str) -> Option<&FieldDef> {
		self.args.iter().find(|a| a.name == name)
	}
}

/// A named set of tools a stream is validated against. `action="<name>"` not
/// present here is an early, unrecoverable rejection (spec §4.8 "Early
/// rejection").
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
	tools: HashMap<String, ToolSchema>,
}

impl ToolRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, tool: ToolSchema) -> &mut Self {
		self.tools.insert(tool.name.clone(), tool);
		self
	}

	pub fn get(&self, name: &str) -> Option<&ToolSchema> {
		self.tools.get(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::FieldType;

	#[test]
	fn registry_looks_up_by_name() {
		let mut reg = ToolRegistry::new();
		reg.register(ToolSchema::new("search", vec![FieldDef::new("query", FieldType::Str)]));
		assert!(reg.get("search").is_some());
		assert!(reg.get("danger").is_none());
	}

	#[test]
	fn tool_schema_looks_up_args_by_name() {
		let tool = ToolSchema::new("search", vec![FieldDef::new("query", FieldType::Str)]);
		assert!(tool.arg("query").is_some());
		assert!(tool.arg("missing").is_none());
	}
}
