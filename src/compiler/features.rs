//! Feature hierarchy and merge module wiring

use super::CompileState;
use crate::document::Element;
use crate::error::{CompileError, Result};
use crate::model::{Feature, Project};
use std::collections::HashSet;
use tracing::{debug, warn};

fn feature_element(feature: &Feature) -> Element {
    let mut element = Element::new("Feature")
        .attr("Id", feature.id())
        .attr("Title", &feature.name)
        .attr("Absent", if feature.allow_change { "allow" } else { "disallow" })
        .attr("Level", if feature.is_enabled { 1 } else { 2 });
    element.extend_attrs(&feature.attributes);

    if !feature.description.is_empty() {
        element.set_attr("Description", &feature.description);
    }
    if let Some(dir) = &feature.configurable_dir {
        element.set_attr("ConfigurableDirectory", dir);
    }
    if let Some(condition) = &feature.condition {
        element.add(
            Element::new("Condition")
                .attr("Level", condition.level)
                .with_cdata(&condition.text),
        );
    }
    element
}

/// Closest ancestor of `feature` that is emitted, following parent names
fn nearest_retained(project: &Project, feature: &Feature, retained: &[&str]) -> Option<usize> {
    let mut visited = HashSet::new();
    visited.insert(feature.name.as_str());

    let mut parent = feature.parent.as_deref();
    while let Some(name) = parent {
        if !visited.insert(name) {
            return None;
        }
        if let Some(index) = retained.iter().position(|r| *r == name) {
            return Some(index);
        }
        parent = project.find_feature(name).and_then(|f| f.parent.as_deref());
    }
    None
}

fn build(index: usize, slots: &mut [Option<Element>], parents: &[Option<usize>]) -> Option<Element> {
    let mut element = slots[index].take()?;
    for child in 0..parents.len() {
        if parents[child] == Some(index) {
            if let Some(nested) = build(child, slots, parents) {
                element.add(nested);
            }
        }
    }
    Some(element)
}

/// Emit one `Feature` per feature owning components, the default feature
/// first. Features left without components are dropped and their emitted
/// descendants move up to the closest emitted ancestor.
pub(crate) fn process(state: &CompileState, product: &mut Element) {
    let project = state.project;

    let mut retained: Vec<(&Feature, Element)> = Vec::new();
    for feature in project.all_features() {
        let mut components: Vec<&String> = state
            .feature_components
            .get(&feature.name)
            .map(|c| c.iter().collect())
            .unwrap_or_default();
        if feature.name == project.default_feature.name {
            components.extend(state.default_components.iter());
        }

        if components.is_empty() {
            warn!("Feature '{}' has no components and is not emitted", feature.name);
            continue;
        }

        let mut element = feature_element(feature);
        for id in components {
            element.add(Element::new("ComponentRef").attr("Id", id));
        }
        debug!("Feature {} with {} component(s)", feature.name, element.elements_named("ComponentRef").count());
        retained.push((feature, element));
    }

    let names: Vec<&str> = retained.iter().map(|(f, _)| f.name.as_str()).collect();
    let mut parents: Vec<Option<usize>> = retained
        .iter()
        .map(|(f, _)| nearest_retained(project, f, &names))
        .collect();

    // A parent cycle would leave every member unattached; cut it
    for start in 0..parents.len() {
        let mut current = parents[start];
        for _ in 0..parents.len() {
            match current {
                Some(i) if i == start => {
                    parents[start] = None;
                    break;
                }
                Some(i) => current = parents[i],
                None => break,
            }
        }
    }

    let mut slots: Vec<Option<Element>> = retained.into_iter().map(|(_, e)| Some(e)).collect();
    for index in 0..slots.len() {
        if parents[index].is_none() {
            if let Some(element) = build(index, &mut slots, &parents) {
                product.add(element);
            }
        }
    }
}

/// Reference every merge module from its feature. A module without a
/// feature goes to the default one, which must have been emitted; a named
/// feature that was pruned is recreated empty at product level.
pub(crate) fn wire_merge_modules(state: &CompileState, product: &mut Element) -> Result<()> {
    let project = state.project;

    for (module, feature) in &state.merge_modules {
        let feature_id = match feature {
            None => {
                let id = project.default_feature.id();
                if product.find_by_id("Feature", &id).is_none() {
                    return Err(CompileError::MergeModuleWithoutFeature {
                        module: module.clone(),
                        default_feature: project.default_feature.name.clone(),
                    });
                }
                id
            }
            Some(name) => {
                let declared = project.find_feature(name).ok_or_else(|| CompileError::UnknownFeature {
                    entity: format!("merge module '{}'", module),
                    feature: name.clone(),
                })?;
                let id = declared.id();
                if product.find_by_id("Feature", &id).is_none() {
                    debug!("Creating feature {} for merge module {}", id, module);
                    product.add(feature_element(declared));
                }
                id
            }
        };

        if let Some(element) = product.find_by_id_mut("Feature", &feature_id) {
            element.add(Element::new("MergeRef").attr("Id", module));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::guid::IdGenerator;

    fn features_of(project: &Project, setup: impl FnOnce(&mut CompileState)) -> Result<Element> {
        let options = CompilerOptions::default();
        let mut state = CompileState::new(project, &options, IdGenerator::new())?;
        setup(&mut state);
        let mut product = Element::new("Product");
        process(&state, &mut product);
        wire_merge_modules(&state, &mut product)?;
        Ok(product)
    }

    #[test]
    fn test_default_feature_gets_unassigned_components() {
        let project = Project::new("MyApp");
        let product = features_of(&project, |state| {
            state.default_components.push("Component.a.exe".into());
        })
        .unwrap();

        let features: Vec<&Element> = product.elements_named("Feature").collect();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id(), Some("Complete"));
        assert_eq!(features[0].get_attr("Level"), Some("1"));
        let refs: Vec<&str> = features[0].elements_named("ComponentRef").filter_map(|r| r.id()).collect();
        assert_eq!(refs, vec!["Component.a.exe"]);
    }

    #[test]
    fn test_empty_features_are_dropped() {
        let project = Project::new("MyApp").feature(Feature::new("Docs")).feature(Feature::new("Samples"));
        let product = features_of(&project, |state| {
            state.feature_components.insert("Docs".into(), vec!["Component.manual.pdf".into()]);
        })
        .unwrap();

        let ids: Vec<&str> = product.elements_named("Feature").filter_map(|f| f.id()).collect();
        assert_eq!(ids, vec!["Docs"]);
    }

    #[test]
    fn test_child_moves_to_nearest_retained_ancestor() {
        let project = Project::new("MyApp")
            .feature(Feature::new("Docs").child_of("Complete"))
            .feature(Feature::new("Api").child_of("Docs"));
        let product = features_of(&project, |state| {
            state.default_components.push("Component.a.exe".into());
            state.feature_components.insert("Api".into(), vec!["Component.api.chm".into()]);
        })
        .unwrap();

        let complete = product.child("Feature").unwrap();
        assert_eq!(complete.id(), Some("Complete"));
        let nested = complete.child("Feature").unwrap();
        assert_eq!(nested.id(), Some("Api"));
        assert!(product.find_by_id("Feature", "Docs").is_none());
    }

    #[test]
    fn test_parent_cycle_still_emits_features() {
        let project = Project::new("MyApp")
            .feature(Feature::new("A").child_of("B"))
            .feature(Feature::new("B").child_of("A"));
        let product = features_of(&project, |state| {
            state.feature_components.insert("A".into(), vec!["ca".into()]);
            state.feature_components.insert("B".into(), vec!["cb".into()]);
        })
        .unwrap();

        assert!(product.find_by_id("Feature", "A").is_some());
        assert!(product.find_by_id("Feature", "B").is_some());
    }

    #[test]
    fn test_feature_attributes() {
        let feature = Feature::new("Docs")
            .with_description("Manuals")
            .disabled()
            .required()
            .with_condition(1, "INSTALLLEVEL > 100");
        let element = feature_element(&feature);
        assert_eq!(element.get_attr("Absent"), Some("disallow"));
        assert_eq!(element.get_attr("Level"), Some("2"));
        assert_eq!(element.get_attr("Description"), Some("Manuals"));
        assert_eq!(element.child("Condition").unwrap().text(), "INSTALLLEVEL > 100");
    }

    #[test]
    fn test_merge_module_without_default_feature_fails() {
        let project = Project::new("MyApp");
        let err = features_of(&project, |state| {
            state.merge_modules.push(("Crt".into(), None));
        })
        .unwrap_err();
        assert!(matches!(err, CompileError::MergeModuleWithoutFeature { module, .. } if module == "Crt"));
    }

    #[test]
    fn test_merge_module_creates_missing_feature() {
        let project = Project::new("MyApp").feature(Feature::new("Runtime"));
        let product = features_of(&project, |state| {
            state.default_components.push("Component.a.exe".into());
            state.merge_modules.push(("Crt".into(), Some("Runtime".into())));
            state.merge_modules.push(("Extra".into(), None));
        })
        .unwrap();

        let runtime = product.find_by_id("Feature", "Runtime").unwrap();
        assert_eq!(runtime.child("MergeRef").unwrap().id(), Some("Crt"));
        let complete = product.find_by_id("Feature", "Complete").unwrap();
        assert_eq!(complete.child("MergeRef").unwrap().id(), Some("Extra"));
    }

    #[test]
    fn test_recreated_feature_keeps_its_flags() {
        let mut runtime = Feature::new("Runtime").disabled().required();
        runtime.attributes.insert("Display".into(), "hidden".into());
        let project = Project::new("MyApp").feature(runtime);
        let product = features_of(&project, |state| {
            state.merge_modules.push(("Crt".into(), Some("Runtime".into())));
        })
        .unwrap();

        let runtime = product.find_by_id("Feature", "Runtime").unwrap();
        assert_eq!(runtime.get_attr("Level"), Some("2"));
        assert_eq!(runtime.get_attr("Absent"), Some("disallow"));
        assert_eq!(runtime.get_attr("Display"), Some("hidden"));
        assert_eq!(runtime.child("MergeRef").unwrap().id(), Some("Crt"));
    }
}
