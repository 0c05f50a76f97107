use std::time::Instant;

use tilemm_core::runtime::{
    compiler::{CompilationError, CompileOptions},
    server::{
        CubeCount, CubeDim, DeviceProperties, ExecutionError, LaunchGeometry, MatmulBindings,
    },
    Runtime,
};

use super::{emulate_tiled_matmul, DummyFunction};

/// The dummy runtime compiles nothing and runs the tiled algorithm on the host, unit by unit.
///
/// It is used to test the kernel lifecycle without a device.
#[derive(Debug)]
pub struct DummyRuntime;

/// The dummy device.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct DummyDevice;

#[derive(Debug)]
pub struct DummyContext {
    pub properties: DeviceProperties,
}

impl Default for DummyContext {
    fn default() -> Self {
        Self {
            properties: DeviceProperties::new(
                1024,
                CubeDim::new(1024, 1024, 64),
                CubeCount::new(u16::MAX as u32, u16::MAX as u32, u16::MAX as u32),
            ),
        }
    }
}

impl Runtime for DummyRuntime {
    type Device = DummyDevice;
    type Context = DummyContext;
    type Function = DummyFunction;

    fn context(_device: &Self::Device) -> Result<Self::Context, ExecutionError> {
        Ok(DummyContext::default())
    }

    fn name() -> &'static str {
        "dummy"
    }

    fn properties(context: &Self::Context) -> DeviceProperties {
        context.properties
    }

    fn compile(
        _context: &Self::Context,
        source: &str,
        entrypoint: &str,
        options: &CompileOptions,
    ) -> Result<Self::Function, CompilationError> {
        let errors: Vec<&str> = source
            .lines()
            .filter(|line| line.trim_start().starts_with("#error"))
            .collect();
        if !errors.is_empty() {
            return Err(CompilationError::Toolchain {
                log: errors.join("\n"),
            });
        }

        if !source.contains(&format!("void {entrypoint}(")) {
            return Err(CompilationError::MissingEntrypoint {
                name: entrypoint.to_string(),
                reason: "named symbol not found".to_string(),
            });
        }

        Ok(DummyFunction {
            tile_width: tile_width_of(source),
            options: options.to_args(),
        })
    }

    fn launch(
        _context: &Self::Context,
        function: &Self::Function,
        geometry: LaunchGeometry,
        bindings: MatmulBindings<'_>,
        timed: bool,
    ) -> Result<Option<f64>, ExecutionError> {
        let start = timed.then(Instant::now);

        emulate_tiled_matmul(function, geometry, bindings)?;

        Ok(start.map(|start| start.elapsed().as_secs_f64() * 1000.0))
    }
}

fn tile_width_of(source: &str) -> Option<u32> {
    source
        .lines()
        .find_map(|line| line.trim().strip_prefix("#define TILE_WIDTH "))
        .and_then(|value| value.trim().parse().ok())
}
