//! Loading and calling raindrops modules under wasmtime.

use std::path::Path;

use raindrops::{unpack_span, Span};
use tracing::{debug, info};
use wasmtime::{
    Engine, ExternType, Func, Instance, Linker, Memory, MemoryType, Module, Store, Trap, TypedFunc,
};

use crate::config::HostConfig;
use crate::error::{chain, HostError};

/// Text-format module with the exercise's original interface.
pub const REFERENCE_WAT: &str = include_str!("../fixtures/raindrops.wat");

/// Compiles modules against one engine and configuration.
pub struct RaindropsHost {
    engine: Engine,
    config: HostConfig,
}

impl RaindropsHost {
    pub fn new(config: HostConfig) -> Result<Self, HostError> {
        config.validate()?;

        let mut wasm_config = wasmtime::Config::new();
        wasm_config.async_support(true);
        if config.fuel.is_some() {
            wasm_config.consume_fuel(true);
        }
        let engine = Engine::new(&wasm_config).map_err(|e| HostError::Engine(chain(e)))?;

        Ok(Self { engine, config })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Compile a module from binary or text format.
    pub fn load(&self, bytes: impl AsRef<[u8]>) -> Result<RaindropsModule, HostError> {
        let module =
            Module::new(&self.engine, bytes.as_ref()).map_err(|e| HostError::Compile(chain(e)))?;
        info!(
            imports = module.imports().len(),
            exports = module.exports().len(),
            "compiled module"
        );
        Ok(RaindropsModule {
            engine: self.engine.clone(),
            module,
            config: self.config.clone(),
        })
    }

    pub fn load_file(&self, path: &Path) -> Result<RaindropsModule, HostError> {
        let bytes = std::fs::read(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), size = bytes.len(), "read module");
        self.load(bytes)
    }

    pub fn load_reference(&self) -> Result<RaindropsModule, HostError> {
        self.load(REFERENCE_WAT)
    }
}

/// A compiled module, ready to be instantiated.
#[derive(Clone)]
pub struct RaindropsModule {
    engine: Engine,
    module: Module,
    config: HostConfig,
}

impl RaindropsModule {
    /// Instantiate with fresh state.
    ///
    /// A memory import is satisfied with a host-created memory; otherwise the
    /// module must export `memory`.
    pub async fn instantiate(&self) -> Result<RaindropsInstance, HostError> {
        let mut store = Store::new(&self.engine, ());
        let mut linker = Linker::new(&self.engine);

        let mut imported = None;
        for import in self.module.imports() {
            if let ExternType::Memory(ty) = import.ty() {
                let memory_ty = self.provided_memory_type(&ty)?;
                let pages = memory_ty.minimum();
                let memory = Memory::new_async(&mut store, memory_ty)
                    .await
                    .map_err(|e| HostError::Instantiate(chain(e)))?;
                linker
                    .define(&store, import.module(), import.name(), memory)
                    .map_err(|e| HostError::Instantiate(chain(e)))?;
                debug!(
                    module = import.module(),
                    name = import.name(),
                    pages,
                    "provided linear memory"
                );
                imported = Some(memory);
            }
        }

        let instance = linker
            .instantiate_async(&mut store, &self.module)
            .await
            .map_err(|e| HostError::Instantiate(chain(e)))?;

        let memory = match imported {
            Some(memory) => memory,
            None => instance
                .get_memory(&mut store, "memory")
                .ok_or(HostError::MissingMemory)?,
        };
        let convert = resolve_export(&mut store, &instance, &self.config.export)?;

        Ok(RaindropsInstance {
            store,
            memory,
            convert,
            fuel: self.config.fuel,
        })
    }

    /// Convert `n` on a fresh instance.
    pub async fn convert(&self, n: u32) -> Result<String, HostError> {
        self.instantiate().await?.convert(n).await
    }

    fn provided_memory_type(&self, import: &MemoryType) -> Result<MemoryType, HostError> {
        if import.is_64() || import.is_shared() {
            return Err(HostError::Instantiate(
                "only unshared 32-bit memory imports are supported".to_string(),
            ));
        }
        let import_min = u32::try_from(import.minimum())
            .map_err(|_| HostError::Instantiate("memory import minimum too large".to_string()))?;
        let import_max = import.maximum().map(|max| max.min(u64::from(u32::MAX)) as u32);

        let minimum = self.config.initial_pages.max(import_min);
        let maximum = match (self.config.max_pages, import_max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(max) = maximum {
            if max < minimum {
                return Err(HostError::Config(format!(
                    "module needs {minimum} pages but at most {max} are allowed"
                )));
            }
        }
        Ok(MemoryType::new(minimum, maximum))
    }
}

#[derive(Clone)]
enum ConvertExport {
    /// `(i32) -> (i32, i32)`
    MultiValue(TypedFunc<i32, (i32, i32)>),
    /// `(i32) -> i64`, span packed as `(offset << 32) | len`
    Packed(TypedFunc<i32, i64>),
}

fn resolve_export(
    store: &mut Store<()>,
    instance: &Instance,
    name: &str,
) -> Result<ConvertExport, HostError> {
    let func: Func = instance
        .get_func(&mut *store, name)
        .ok_or_else(|| HostError::MissingExport(name.to_string()))?;

    if let Ok(typed) = func.typed::<i32, (i32, i32)>(&*store) {
        return Ok(ConvertExport::MultiValue(typed));
    }
    if let Ok(typed) = func.typed::<i32, i64>(&*store) {
        return Ok(ConvertExport::Packed(typed));
    }
    Err(HostError::UnsupportedSignature {
        export: name.to_string(),
        found: format!("{:?}", func.ty(&*store)),
    })
}

/// A live instance. Calls run one at a time and each call overwrites the
/// module's output buffer, so results are decoded before returning.
pub struct RaindropsInstance {
    store: Store<()>,
    memory: Memory,
    convert: ConvertExport,
    fuel: Option<u64>,
}

impl RaindropsInstance {
    pub async fn convert(&mut self, n: u32) -> Result<String, HostError> {
        if n == 0 {
            return Err(HostError::InvalidInput(n));
        }
        if let Some(fuel) = self.fuel {
            self.store
                .set_fuel(fuel)
                .map_err(|e| HostError::Fuel(chain(e)))?;
        }

        // wasm i32 parameters carry the full u32 range as a bit pattern.
        let arg = n as i32;
        let span = match &self.convert {
            ConvertExport::MultiValue(func) => {
                let (offset, len) = func
                    .call_async(&mut self.store, arg)
                    .await
                    .map_err(trapped)?;
                Span::new(offset as u32, len as u32)
            }
            ConvertExport::Packed(func) => {
                let packed = func
                    .call_async(&mut self.store, arg)
                    .await
                    .map_err(trapped)?;
                unpack_span(packed as u64)
            }
        };
        debug!(n, offset = span.offset, len = span.len, "convert returned span");

        if span.is_empty() {
            return Err(HostError::Rejected(n));
        }
        self.read_span(span)
    }

    /// Current size of the instance's linear memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    fn read_span(&self, span: Span) -> Result<String, HostError> {
        let data = self.memory.data(&self.store);
        let out_of_bounds = HostError::OutOfBounds {
            offset: span.offset,
            len: span.len,
            memory_size: data.len(),
        };
        let end = match span.end() {
            Some(end) if end as usize <= data.len() => end as usize,
            _ => return Err(out_of_bounds),
        };
        let text = std::str::from_utf8(&data[span.offset as usize..end])?;
        Ok(text.to_owned())
    }
}

fn trapped(err: wasmtime::Error) -> HostError {
    match err.downcast_ref::<Trap>() {
        Some(trap) => HostError::Trap(trap.to_string()),
        None => HostError::Trap(chain(err)),
    }
}
