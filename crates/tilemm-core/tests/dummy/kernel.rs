use core::ops::{Add, Mul};

use tilemm_core::runtime::server::{ExecutionError, LaunchGeometry, MatmulBindings};

/// A "compiled" dummy function, remembering what the source declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyFunction {
    pub tile_width: Option<u32>,
    pub options: Vec<String>,
}

/// Run the shared memory tiled algorithm on the host, one cube and one unit at a time.
///
/// Units outside of the matrix load zeros and skip the final write, like the device kernel.
pub fn emulate_tiled_matmul(
    function: &DummyFunction,
    geometry: LaunchGeometry,
    bindings: MatmulBindings<'_>,
) -> Result<(), ExecutionError> {
    let tile_width = geometry.cube_dim.x as usize;
    if let Some(compiled) = function.tile_width {
        if compiled as usize != tile_width {
            return Err(ExecutionError::Launch {
                reason: format!(
                    "kernel compiled for tiles of {compiled}, launched with {tile_width}"
                ),
            });
        }
    }

    let size = bindings.size as usize;
    let elems = size * size;
    if bindings.out.len() != bindings.lhs.len() || bindings.out.len() != bindings.rhs.len() {
        return Err(ExecutionError::Transfer {
            reason: "buffers have different lengths".to_string(),
        });
    }

    match bindings.out.len().checked_div(elems) {
        Some(4) => run::<f32>(geometry, size, bindings),
        Some(8) => run::<f64>(geometry, size, bindings),
        _ => Err(ExecutionError::Launch {
            reason: format!("unsupported buffer of {} bytes", bindings.out.len()),
        }),
    }
}

fn run<E>(
    geometry: LaunchGeometry,
    size: usize,
    bindings: MatmulBindings<'_>,
) -> Result<(), ExecutionError>
where
    E: bytemuck::Pod + Default + Add<Output = E> + Mul<Output = E>,
{
    // Bindings are views of host matrices, so they are aligned for `E`.
    let lhs: &[E] = bytemuck::cast_slice(bindings.lhs);
    let rhs: &[E] = bytemuck::cast_slice(bindings.rhs);
    let mut out: Vec<E> = bytemuck::cast_slice(&*bindings.out).to_vec();

    let tile = geometry.cube_dim.x as usize;
    let tiles = size.div_ceil(tile);
    let load = |matrix: &[E], row: usize, col: usize| {
        if row < size && col < size {
            matrix[row * size + col]
        } else {
            E::default()
        }
    };

    for by in 0..geometry.cube_count.y as usize {
        for bx in 0..geometry.cube_count.x as usize {
            for ty in 0..tile {
                for tx in 0..tile {
                    let row = by * tile + ty;
                    let col = bx * tile + tx;
                    let mut value = E::default();

                    for m in 0..tiles {
                        for k in 0..tile {
                            let index = m * tile + k;
                            value = value + load(lhs, row, index) * load(rhs, index, col);
                        }
                    }

                    if row < size && col < size {
                        out[row * size + col] = value;
                    }
                }
            }
        }
    }

    bindings.out.copy_from_slice(bytemuck::cast_slice(&out));
    Ok(())
}
