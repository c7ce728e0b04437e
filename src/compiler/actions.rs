//! Custom action emission and sequencing
//!
//! Actions are processed in declaration order. The only state carried from
//! one action to the next is the id of the last emitted action, which
//! resolves the `PreviousAction*` placements.

use super::directories::find_dir;
use super::{CompileState, WixExtension};
use crate::document::Element;
use crate::error::{CompileError, Result};
use crate::folders;
use crate::guid::IdKind;
use crate::model::{yes_no, ActionKind, CustomAction, Execute, Step, When};
use tracing::debug;

/// Where a `Custom` element puts its action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Placement {
    Number(u32),
    Anchor { when: When, action: String },
}

impl Placement {
    fn apply(&self, custom: &mut Element) {
        match self {
            Placement::Number(n) => custom.set_attr("Sequence", n),
            Placement::Anchor { when, action } => custom.set_attr(when.as_str(), action),
        }
    }
}

/// Resolves relative placements against the previously emitted action
#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    last_action: Option<String>,
}

impl Sequencer {
    pub fn placement(&self, action: &CustomAction) -> Result<Placement> {
        if let Some(n) = action.sequence_number {
            return Ok(Placement::Number(n));
        }

        let anchor = match &action.step {
            Step::PreviousAction => self.last_action.clone().ok_or_else(|| {
                CompileError::PreviousActionUnavailable {
                    action: action.name.clone(),
                }
            })?,
            Step::PreviousActionOrInstallInitialize => self
                .last_action
                .clone()
                .unwrap_or_else(|| Step::INSTALL_INITIALIZE.to_string()),
            Step::PreviousActionOrInstallFinalize => self
                .last_action
                .clone()
                .unwrap_or_else(|| Step::INSTALL_FINALIZE.to_string()),
            Step::Named(name) => name.clone(),
        };

        Ok(Placement::Anchor {
            when: action.when,
            action: anchor,
        })
    }

    pub fn emitted(&mut self, id: &str) {
        self.last_action = Some(id.to_string());
    }
}

/// Emit every custom action with its binaries and sequence entries
pub(crate) fn process(state: &mut CompileState, product: &mut Element) -> Result<()> {
    let project = state.project;

    for action in &project.actions {
        if let Some(id) = &action.id {
            state.ids.reserve(IdKind::Action, id);
        }
    }

    let mut sequencer = Sequencer::default();
    for action in &project.actions {
        let id = match &action.id {
            Some(id) => id.clone(),
            None => state.ids.from_name(IdKind::Action, &folders::expand(&action.name)),
        };
        let placement = sequencer.placement(action)?;
        debug!("Custom action {} placed {:?}", id, placement);

        let last = emit(state, product, action, &id, &placement)?;
        sequencer.emitted(&last);
    }
    Ok(())
}

/// Add one `Custom` entry per sequence the action runs in
fn schedule(product: &mut Element, action: &CustomAction, id: &str, condition: Option<&str>, placement: &Placement) {
    for sequence in &action.sequences {
        let mut custom = Element::new("Custom").attr("Action", id);
        if let Some(condition) = condition {
            custom = custom.with_text(condition);
        }
        placement.apply(&mut custom);
        product.child_or_create(sequence.as_str()).add(custom);
    }
}

fn with_attributes(mut element: Element, action: &CustomAction) -> Element {
    element.extend_attrs(&action.attributes);
    element
}

fn command_line(app_path: &str, args: &str) -> String {
    let app = folders::expand_command_path(app_path);
    let args = folders::expand_command_path(args);
    if args.is_empty() {
        format!("\"{}\"", app)
    } else {
        format!("\"{}\" {}", app, args)
    }
}

/// Property mapping captured for a deferred action: `NAME` becomes
/// `NAME=[NAME]`, `NAME=value` is kept
fn property_mapping(properties: &[String]) -> String {
    properties
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.contains('=') {
                p.to_string()
            } else {
                format!("{0}=[{0}]", p)
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Emit the action's elements. Returns the id later actions anchor to.
fn emit(
    state: &mut CompileState,
    product: &mut Element,
    action: &CustomAction,
    id: &str,
    placement: &Placement,
) -> Result<String> {
    let execute = action.execute.as_str();
    let return_ = action.return_.as_str();
    let impersonate = yes_no(action.impersonate);

    match &action.kind {
        ActionKind::SetProperty { property, value } => {
            let element = Element::new("CustomAction")
                .attr("Id", id)
                .attr("Property", property)
                .attr("Value", value);
            product.add(with_attributes(element, action));
        }

        ActionKind::Script { code } => {
            let element = Element::new("CustomAction")
                .attr("Id", id)
                .attr("Script", "vbscript")
                .attr("Return", return_)
                .attr("Execute", execute)
                .attr("Impersonate", impersonate)
                .with_cdata(code);
            product.add(with_attributes(element, action));
        }

        ActionKind::ScriptFile { script_file, procedure } => {
            let binary_key = format!("{}_File", id);
            product.add(
                Element::new("Binary")
                    .attr("Id", &binary_key)
                    .attr("SourceFile", state.source_path(script_file)),
            );
            let element = Element::new("CustomAction")
                .attr("Id", id)
                .attr("BinaryKey", binary_key)
                .attr("VBScriptCall", procedure)
                .attr("Return", return_)
                .attr("Execute", execute)
                .attr("Impersonate", impersonate);
            product.add(with_attributes(element, action));
        }

        ActionKind::Managed {
            assembly,
            method,
            uses_properties,
        } => {
            let binary_key = managed_binary(state, product, assembly, id);

            if action.execute == Execute::Deferred && !uses_properties.is_empty() {
                let set_id = format!("Set_{}_Props", id);
                product.add(
                    Element::new("CustomAction")
                        .attr("Id", &set_id)
                        .attr("Property", id)
                        .attr("Value", property_mapping(uses_properties)),
                );
                let before = Placement::Anchor {
                    when: When::Before,
                    action: id.to_string(),
                };
                // The capture runs whenever the action might
                schedule(product, action, &set_id, None, &before);
            }

            let element = Element::new("CustomAction")
                .attr("Id", id)
                .attr("BinaryKey", binary_key)
                .attr("DllEntry", method)
                .attr("Impersonate", impersonate)
                .attr("Execute", execute)
                .attr("Return", return_);
            product.add(with_attributes(element, action));
        }

        ActionKind::QtCmdLine { app_path, args } => {
            state.use_extension(WixExtension::Util);

            let set_id = format!("Set_{}_CmdLine", id);
            let set = Element::new("CustomAction")
                .attr("Id", &set_id)
                .attr("Property", "QtExecCmdLine")
                .attr("Value", command_line(app_path, args));
            product.add(with_attributes(set, action));
            schedule(product, action, &set_id, Some(&action.condition), placement);

            product.add(
                Element::new("CustomAction")
                    .attr("Id", id)
                    .attr("BinaryKey", "WixCA")
                    .attr("DllEntry", "CAQuietExec")
                    .attr("Impersonate", impersonate)
                    .attr("Execute", execute)
                    .attr("Return", return_),
            );
            let after = Placement::Anchor {
                when: When::After,
                action: set_id,
            };
            schedule(product, action, id, Some(&action.condition), &after);
            return Ok(id.to_string());
        }

        ActionKind::InstalledFile { file_key, args } => {
            let element = Element::new("CustomAction")
                .attr("Id", id)
                .attr("ExeCommand", folders::expand_command_path(args))
                .attr("Return", return_)
                .attr("Execute", execute)
                .attr("Impersonate", impersonate)
                .attr("FileKey", file_key);
            product.add(with_attributes(element, action));
        }

        ActionKind::BinaryFile { binary_key, args } => {
            let element = Element::new("CustomAction")
                .attr("Id", id)
                .attr("ExeCommand", folders::expand_command_path(args))
                .attr("Impersonate", impersonate)
                .attr("Execute", execute)
                .attr("Return", return_)
                .attr("BinaryKey", binary_key);
            product.add(with_attributes(element, action));
        }

        ActionKind::PathFile {
            app_path,
            args,
            working_dir,
        } => {
            let directory = find_dir(&state.project.dirs, working_dir)
                .and_then(|dir| dir.id.clone())
                .unwrap_or_else(|| folders::expand(working_dir));
            let element = Element::new("CustomAction")
                .attr("Id", id)
                .attr("ExeCommand", command_line(app_path, args))
                .attr("Return", return_)
                .attr("Execute", execute)
                .attr("Impersonate", impersonate)
                .attr("Directory", directory);
            product.add(with_attributes(element, action));
        }
    }

    schedule(product, action, id, Some(&action.condition), placement);
    Ok(id.to_string())
}

/// Binary key of the packaged assembly, emitting the binary and the
/// packaging request on first use
fn managed_binary(state: &mut CompileState, product: &mut Element, assembly: &str, id: &str) -> String {
    let source = state.source_path(assembly);
    let packaged = state.packaged_path(&source);

    let existing = product
        .elements_named("Binary")
        .find(|b| b.get_attr("SourceFile") == Some(packaged.as_str()))
        .and_then(|b| b.id().map(String::from));
    if let Some(key) = existing {
        debug!("Reusing binary {} for {}", key, id);
        return key;
    }

    let key = format!("{}_File", id);
    product.add(
        Element::new("Binary")
            .attr("Id", &key)
            .attr("SourceFile", &packaged),
    );
    state.request_packaging(source, packaged);
    key
}
