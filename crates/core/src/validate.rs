//! Static checks run before any call reaches the management API.
//!
//! Every problem is collected so the user sees the whole list at once.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::flatten::FlatVariables;
use crate::model::DesiredConfig;

/// ADOM and variable names become segments of API resource paths.
const RESOURCE_SEPARATOR: char = '/';

/// Validate a desired-state document.
///
/// # Errors
///
/// Returns [`Error::ValidationFailed`] listing every problem found.
pub fn validate(config: &DesiredConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.adoms.is_empty() {
        errors.push("document declares no adoms".to_string());
    }

    let mut tenant_names = HashSet::new();
    let mut serials = HashSet::new();

    for tenant in &config.adoms {
        if tenant.name.trim().is_empty() {
            errors.push("adom with an empty name".to_string());
        } else if !tenant_names.insert(tenant.name.as_str()) {
            errors.push(format!("duplicate adom '{}'", tenant.name));
        }
        if tenant.name.contains(RESOURCE_SEPARATOR) {
            errors.push(format!("adom name '{}' must not contain '/'", tenant.name));
        }

        check_variable_paths(
            &format!("adom '{}'", tenant.name),
            &tenant.flat_variables(),
            &mut errors,
        );

        let mut device_names = HashSet::new();
        for device in &tenant.devices {
            if device.name.trim().is_empty() {
                errors.push(format!("adom '{}' has a device with an empty name", tenant.name));
            } else if !device_names.insert(device.name.as_str()) {
                errors.push(format!(
                    "duplicate device '{}' in adom '{}'",
                    device.name, tenant.name
                ));
            }

            if device.serial.trim().is_empty() {
                errors.push(format!("device '{}' has an empty serial", device.name));
            } else if !serials.insert(device.serial.as_str()) {
                errors.push(format!(
                    "serial '{}' of device '{}' is already used by another device",
                    device.serial, device.name
                ));
            }

            check_variable_paths(
                &format!("device '{}' in adom '{}'", device.name, tenant.name),
                &device.flat_variables(),
                &mut errors,
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::validation_failed(errors))
    }
}

fn check_variable_paths(scope: &str, flat: &FlatVariables, errors: &mut Vec<String>) {
    for path in flat.duplicate_paths() {
        errors.push(format!("variable path '{path}' is defined twice for {scope}"));
    }

    for entry in flat.iter().filter(|e| e.path.contains(RESOURCE_SEPARATOR)) {
        errors.push(format!(
            "variable path '{}' of {scope} must not contain '/'",
            entry.path
        ));
    }

    if flat.iter().any(|e| e.path.is_empty()) {
        errors.push(format!("variables of {scope} must be an object"));
    }
}
