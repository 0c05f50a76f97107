use crate::{
    config::{KernelConfig, Precision},
    error::GenerateError,
    template::Template,
};

/// Instantiate the template for the given configuration.
///
/// The template owns the control structure of the kernel, including boundary handling; only
/// the element type, the zero literal, the tile width and the inner product are substituted.
pub fn generate(config: &KernelConfig, template: &Template) -> Result<String, GenerateError> {
    let (real, fzero) = device_type(config.precision)?;

    if config.tile_width == 0 {
        return Err(GenerateError::InvalidTileWidth);
    }

    let tile_width = config.tile_width.to_string();
    let inner = inner_product(config.tile_width, config.unroll);

    let source = template.render(&[
        ("real", real),
        ("fzero", fzero),
        ("TW", tile_width.as_str()),
        ("loop", inner.as_str()),
    ])?;

    log::trace!("Generated {config} ({} bytes)", source.len());

    Ok(source)
}

/// Device type name and zero literal of a precision.
fn device_type(precision: Precision) -> Result<(&'static str, &'static str), GenerateError> {
    match precision {
        Precision::Single => Ok(("float", "0.0f")),
        Precision::Double => Ok(("double", "0.0")),
        Precision::Half | Precision::BHalf => Err(GenerateError::UnsupportedPrecision {
            precision: precision.to_string(),
        }),
    }
}

fn inner_product(tile_width: u32, unroll: bool) -> String {
    if unroll {
        (0..tile_width)
            .map(|k| format!("Pvalue += Ms[ty][{k}] * Ns[{k}][tx];\n        "))
            .collect()
    } else {
        format!(
            "for (int k = 0; k < {tile_width}; ++k)\n        {{\n            Pvalue += Ms[ty][k] * Ns[k][tx];\n        }}"
        )
    }
}
