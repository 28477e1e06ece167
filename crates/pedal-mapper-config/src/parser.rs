//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so we need to extract offset/len manually
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "pedal" => {
                config.pedal = parse_pedal(node)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    let val = string_value(child, "log-level")?;
                    global.log_level = val
                        .parse()
                        .map_err(|e| ConfigError::Invalid { message: e })?;
                }
                "poll-interval-ms" => {
                    let val = integer_value(child, "poll-interval-ms")?;
                    if val < 1 || val > i64::from(i32::MAX) {
                        return Err(ConfigError::Invalid {
                            message: format!(
                                "poll-interval-ms must be between 1 and {}, got {}",
                                i32::MAX,
                                val
                            ),
                        });
                    }
                    global.poll_interval_ms = val as u64;
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_pedal(node: &kdl::KdlNode) -> Result<PedalConfig, ConfigError> {
    let mut pedal = PedalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "vendor-id" => {
                    pedal.vendor_id = usb_id_value(child, "vendor-id")?;
                }
                "product-id" => {
                    pedal.product_id = usb_id_value(child, "product-id")?;
                }
                "virtual-device-name" => {
                    let name = string_value(child, "virtual-device-name")?;
                    if name.trim().is_empty() {
                        return Err(ConfigError::Invalid {
                            message: "virtual-device-name must not be empty".to_string(),
                        });
                    }
                    pedal.virtual_device_name = name;
                }
                name => {
                    tracing::warn!("Unknown pedal config option: {}", name);
                }
            }
        }
    }

    Ok(pedal)
}

fn first_value<'a>(
    node: &'a kdl::KdlNode,
    field: &str,
) -> Result<&'a kdl::KdlValue, ConfigError> {
    node.entries()
        .first()
        .map(|entry| entry.value())
        .ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
        })
}

fn string_value(node: &kdl::KdlNode, field: &str) -> Result<String, ConfigError> {
    first_value(node, field)?
        .as_string()
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!("{} expects a string value", field),
        })
}

fn integer_value(node: &kdl::KdlNode, field: &str) -> Result<i64, ConfigError> {
    first_value(node, field)?
        .as_i64()
        .ok_or_else(|| ConfigError::Invalid {
            message: format!("{} expects an integer value", field),
        })
}

/// USB ids are 16 bit; KDL hex literals (`0x0fd9`) are the natural spelling
fn usb_id_value(node: &kdl::KdlNode, field: &str) -> Result<u16, ConfigError> {
    let val = integer_value(node, field)?;
    u16::try_from(val).map_err(|_| ConfigError::Invalid {
        message: format!("{} must be between 0x0000 and 0xffff, got {}", field, val),
    })
}
