//! Standalone entities and product-level definitions
//!
//! Registry values, environment variables, users, databases and
//! certificates are not owned by any directory. Their components hang off
//! the top-level installation directory (see [`with_install_root`]).

use super::components::condition_element;
use super::{with_install_root, CompileState, WixExtension};
use crate::document::Element;
use crate::error::{CompileError, Result};
use crate::folders;
use crate::guid::IdKind;
use crate::model::{yes_no, Certificate, RegValueKind, SqlDatabase, SqlScript, SqlString, User};
use tracing::debug;

/// Install-time conditions, one `Condition` element each
pub(crate) fn launch_conditions(state: &CompileState, product: &mut Element) {
    for condition in &state.project.launch_conditions {
        let mut element = Element::new("Condition")
            .attr("Message", &condition.message)
            .with_cdata(&condition.condition);
        element.extend_attrs(&condition.attributes);
        product.add(element);
    }
}

fn add_standalone(product: &mut Element, comp: Element) {
    with_install_root(product, |dir| {
        dir.add(comp);
    });
}

pub(crate) fn registry(state: &mut CompileState, product: &mut Element) -> Result<()> {
    let project = state.project;

    for (index, value) in project.reg_values.iter().enumerate() {
        let comp_id = format!("Registry{}", index + 1);
        state.assign(&format!("registry value '{}'", value.name), value.feature.as_ref(), &comp_id)?;

        let mut comp = state.component(&comp_id);
        if value.win64 {
            comp.set_attr("Win64", "yes");
        }
        if let Some(condition) = &value.condition {
            comp.add(condition_element(condition));
        }

        let mut key = Element::new("RegistryKey").attr("Root", value.root.as_str());
        if !value.key.is_empty() {
            key.set_attr("Key", &value.key);
        }
        if let Some(action) = value.key_action {
            key.set_attr("Action", action.as_str());
        }
        if value.force_create_on_install {
            key.set_attr("ForceCreateOnInstall", "yes");
        }
        if value.force_delete_on_uninstall {
            key.set_attr("ForceDeleteOnUninstall", "yes");
        }

        let mut reg_value = Element::new("RegistryValue")
            .attr("Type", value.kind.as_str())
            .attr("KeyPath", "yes");
        if !value.name.is_empty() {
            reg_value.set_attr("Name", &value.name);
        }
        reg_value.extend_attrs(&value.attributes);

        let text = folders::expand_command_path(&value.value);
        if value.kind == RegValueKind::MultiString {
            for line in text.lines() {
                reg_value.add(Element::new("MultiStringValue").with_text(line));
            }
        } else {
            reg_value.set_attr("Value", text);
        }

        key.add(reg_value);
        comp.add(key);
        add_standalone(product, comp);
    }
    Ok(())
}

pub(crate) fn env_vars(state: &mut CompileState, product: &mut Element) -> Result<()> {
    let project = state.project;

    for (index, var) in project.env_vars.iter().enumerate() {
        let comp_id = format!("EnvVars{}", index + 1);
        state.assign(&format!("environment variable '{}'", var.name), var.feature.as_ref(), &comp_id)?;

        let mut comp = state.component(&comp_id);
        if let Some(condition) = &var.condition {
            comp.add(condition_element(condition));
        }

        let id = match &var.id {
            Some(id) => id.clone(),
            None => state.ids.from_name(IdKind::EnvVar, &folders::expand(&var.name)),
        };
        let mut element = Element::new("Environment")
            .attr("Id", id)
            .attr("Name", &var.name)
            .attr("Value", folders::expand_command_path(&var.value))
            .attr_opt("Part", var.part.map(|p| p.as_str()))
            .attr("Action", var.action.as_str())
            .attr("Permanent", yes_no(var.permanent))
            .attr("System", yes_no(var.system));
        element.extend_attrs(&var.attributes);

        comp.add(element);
        add_standalone(product, comp);
    }
    Ok(())
}

fn user_element(state: &mut CompileState, user: &User) -> Element {
    let id = match &user.id {
        Some(id) => id.clone(),
        None => state.ids.from_name(IdKind::User, &folders::expand(&user.name)),
    };
    let flags = [
        ("CreateUser", user.create_user),
        ("UpdateIfExists", user.update_if_exists),
        ("RemoveOnUninstall", user.remove_on_uninstall),
        ("FailIfExists", user.fail_if_exists),
        ("PasswordNeverExpires", user.password_never_expires),
        ("CanNotChangePassword", user.can_not_change_password),
    ];

    let mut element = Element::new("util:User")
        .attr("Id", id)
        .attr("Name", &user.name)
        .attr_opt("Domain", user.domain.as_ref())
        .attr_opt("Password", user.password.as_ref());
    for (name, value) in flags {
        if let Some(value) = value {
            element.set_attr(name, yes_no(value));
        }
    }
    element.extend_attrs(&user.attributes);
    element
}

/// Users created by the install get a component; the others are plain
/// references declared at product level.
pub(crate) fn users(state: &mut CompileState, product: &mut Element) -> Result<()> {
    let project = state.project;
    if project.users.is_empty() {
        return Ok(());
    }
    state.use_extension(WixExtension::Util);

    let mut count = 0;
    for user in &project.users {
        let element = user_element(state, user);
        if !user.is_installed() {
            product.add(element);
            continue;
        }

        count += 1;
        let comp_id = format!("User{}", count);
        state.assign(&format!("user '{}'", user.name), user.feature.as_ref(), &comp_id)?;
        add_standalone(product, state.component(&comp_id).with(element));
    }
    Ok(())
}

fn database_element(db: &SqlDatabase, id: &str) -> Element {
    let flags = [
        ("CreateOnInstall", db.create_on_install),
        ("CreateOnReinstall", db.create_on_reinstall),
        ("CreateOnUninstall", db.create_on_uninstall),
        ("DropOnInstall", db.drop_on_install),
        ("DropOnReinstall", db.drop_on_reinstall),
        ("DropOnUninstall", db.drop_on_uninstall),
        ("ConfirmOverwrite", db.confirm_overwrite),
        ("ContinueOnError", db.continue_on_error),
    ];

    let mut element = Element::new("sql:SqlDatabase")
        .attr("Id", id)
        .attr("Database", &db.database)
        .attr("Server", &db.server)
        .attr_opt("Instance", db.instance.as_ref())
        .attr_opt("User", db.user.as_ref());
    for (name, value) in flags {
        if let Some(value) = value {
            element.set_attr(name, yes_no(value));
        }
    }
    element
}

fn execution_flags(element: &mut Element, flags: [(&str, bool); 4], sequence: Option<u32>) {
    for (name, value) in flags {
        if value {
            element.set_attr(name, "yes");
        }
    }
    if let Some(sequence) = sequence {
        element.set_attr("Sequence", sequence);
    }
}

fn sql_string_element(sql: &SqlString, id: String, db_id: Option<&str>) -> Element {
    let mut element = Element::new("sql:SqlString")
        .attr("Id", id)
        .attr("SQL", &sql.sql)
        .attr_opt("SqlDb", db_id);
    execution_flags(
        &mut element,
        [
            ("ExecuteOnInstall", sql.execute_on_install),
            ("ExecuteOnReinstall", sql.execute_on_reinstall),
            ("ExecuteOnUninstall", sql.execute_on_uninstall),
            ("ContinueOnError", sql.continue_on_error),
        ],
        sql.sequence,
    );
    element
}

fn sql_script_element(script: &SqlScript, id: String, db_id: Option<&str>) -> Element {
    let mut element = Element::new("sql:SqlScript")
        .attr("Id", id)
        .attr("BinaryKey", &script.binary_key)
        .attr_opt("SqlDb", db_id);
    execution_flags(
        &mut element,
        [
            ("ExecuteOnInstall", script.execute_on_install),
            ("ExecuteOnReinstall", script.execute_on_reinstall),
            ("ExecuteOnUninstall", script.execute_on_uninstall),
            ("ContinueOnError", script.continue_on_error),
        ],
        script.sequence,
    );
    element
}

/// Databases created or dropped by the install own a component with their
/// statements nested inside. Other databases are declared at product level
/// and each statement gets its own component referencing the database.
pub(crate) fn sql(state: &mut CompileState, product: &mut Element) -> Result<()> {
    let project = state.project;
    if project.sql_databases.is_empty() {
        return Ok(());
    }
    state.use_extension(WixExtension::Sql);

    let mut db_count = 0;
    let mut string_count = 0;
    let mut script_count = 0;

    for db in &project.sql_databases {
        let db_id = match &db.id {
            Some(id) => id.clone(),
            None => state.ids.from_name(IdKind::Database, &folders::expand(&db.database)),
        };
        let mut db_element = database_element(db, &db_id);

        if db.is_installed() {
            db_count += 1;
            let comp_id = format!("SqlDatabase{}", db_count);
            state.assign(&format!("database '{}'", db.database), db.feature.as_ref(), &comp_id)?;

            for (n, sql) in db.strings.iter().enumerate() {
                let id = sql.id.clone().unwrap_or_else(|| format!("{}.SqlString{}", db_id, n + 1));
                db_element.add(sql_string_element(sql, id, None));
            }
            for (n, script) in db.scripts.iter().enumerate() {
                let id = script.id.clone().unwrap_or_else(|| format!("{}.SqlScript{}", db_id, n + 1));
                db_element.add(sql_script_element(script, id, None));
            }

            add_standalone(product, state.component(&comp_id).with(db_element));
            continue;
        }

        for (n, sql) in db.strings.iter().enumerate() {
            string_count += 1;
            let comp_id = format!("SqlString{}", string_count);
            state.assign(&format!("SQL string of '{}'", db.database), sql.feature.as_ref(), &comp_id)?;

            let id = sql.id.clone().unwrap_or_else(|| format!("{}.SqlString{}", db_id, n + 1));
            let element = sql_string_element(sql, id, Some(&db_id));
            add_standalone(product, state.component(&comp_id).with(element));
        }
        for (n, script) in db.scripts.iter().enumerate() {
            script_count += 1;
            let comp_id = format!("SqlScript{}", script_count);
            state.assign(&format!("SQL script of '{}'", db.database), script.feature.as_ref(), &comp_id)?;

            let id = script.id.clone().unwrap_or_else(|| format!("{}.SqlScript{}", db_id, n + 1));
            let element = sql_script_element(script, id, Some(&db_id));
            add_standalone(product, state.component(&comp_id).with(element));
        }

        product.add(db_element);
    }
    Ok(())
}

fn certificate_element(state: &mut CompileState, cert: &Certificate) -> Element {
    let id = match &cert.id {
        Some(id) => id.clone(),
        None => state.ids.from_name(IdKind::Certificate, &folders::expand(&cert.name)),
    };
    let mut element = Element::new("iis:Certificate")
        .attr("Id", id)
        .attr("Name", &cert.name)
        .attr("StoreLocation", &cert.store_location)
        .attr("StoreName", &cert.store_name)
        .attr_opt("BinaryKey", cert.binary_key.as_ref())
        .attr_opt("CertificatePath", cert.certificate_path.as_ref())
        .attr_opt("PFXPassword", cert.pfx_password.as_ref())
        .attr("Request", yes_no(cert.request))
        .attr("Overwrite", yes_no(cert.overwrite));
    element.extend_attrs(&cert.attributes);
    element
}

pub(crate) fn certificates(state: &mut CompileState, product: &mut Element) -> Result<()> {
    let project = state.project;
    if project.certificates.is_empty() {
        return Ok(());
    }
    state.use_extension(WixExtension::IIs);

    for (index, cert) in project.certificates.iter().enumerate() {
        let comp_id = format!("Certificate{}", index + 1);
        state.assign(&format!("certificate '{}'", cert.name), cert.feature.as_ref(), &comp_id)?;

        let element = certificate_element(state, cert);
        add_standalone(product, state.component(&comp_id).with(element));
    }
    Ok(())
}

/// Plain properties, registry-search backed properties and references
pub(crate) fn properties(state: &CompileState, product: &mut Element) -> Result<()> {
    for prop in &state.project.properties {
        if prop.is_ref {
            if prop.name.is_empty() {
                return Err(CompileError::EmptyPropertyRef);
            }
            product.add(Element::new("PropertyRef").attr("Id", &prop.name));
            continue;
        }

        let mut element = Element::new("Property").attr("Id", &prop.name);
        match &prop.registry {
            Some(search) => {
                if !prop.value.is_empty() {
                    element.set_attr("Value", &prop.value);
                }
                element.add(
                    Element::new("RegistrySearch")
                        .attr("Id", format!("{}_RegSearch", prop.name))
                        .attr("Root", search.root.as_str())
                        .attr("Key", &search.key)
                        .attr("Type", "raw")
                        .attr_opt(
                            "Name",
                            Some(&search.entry_name).filter(|name| !name.is_empty()),
                        ),
                );
            }
            None => element.set_attr("Value", &prop.value),
        }
        element.extend_attrs(&prop.attributes);
        product.add(element);
    }
    Ok(())
}

/// Embedded binaries. Managed assemblies are referenced by the native DLL
/// the external packager will produce.
pub(crate) fn binaries(state: &mut CompileState, product: &mut Element) {
    let project = state.project;

    for bin in &project.binaries {
        let id = match &bin.id {
            Some(id) => id.clone(),
            None => {
                let file_name = bin.name.rsplit(['\\', '/']).next().unwrap_or(&bin.name);
                state.ids.from_name(IdKind::Binary, &folders::expand(file_name))
            }
        };

        let source = state.source_path(&bin.name);
        let source = if bin.managed {
            let packaged = state.packaged_path(&source);
            state.request_packaging(source, packaged.clone());
            packaged
        } else {
            source
        };

        debug!("Binary {} from {}", id, source);
        let mut element = Element::new("Binary").attr("Id", id).attr("SourceFile", source);
        element.extend_attrs(&bin.attributes);
        product.add(element);
    }
}
