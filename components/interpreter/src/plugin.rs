//! Plugin loading.
//!
//! Plugins are dynamic libraries patched into a running VM. The loader
//! resolves symbols by undecorated name: an optional `PluginGetInfo`
//! handshake gates on the packed ABI version range, `PluginInit` is the
//! required entry point, and `PluginShutdown` runs at unload. Plugins are
//! trusted code; a crash in plugin code crashes the VM.

use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use libloading::Library;

use core_types::{ErrorKind, RuntimeError, RuntimeResult};

use crate::vm::VirtualMachine;

/// Major ABI version; bumps may break existing plugins.
pub const ABI_MAJOR: u16 = 1;
/// Minor ABI version; bumps add optional surface.
pub const ABI_MINOR: u16 = 0;

/// Pack a major/minor pair into the 32-bit wire form.
pub const fn pack_abi_version(major: u16, minor: u16) -> u32 {
    ((major as u32) << 16) | (minor as u32 & 0xFFFF)
}

/// The runtime's own packed ABI version.
pub const RUNTIME_ABI_VERSION_PACKED: u32 = pack_abi_version(ABI_MAJOR, ABI_MINOR);

/// Handshake struct a plugin fills from `PluginGetInfo`.
#[repr(C)]
pub struct PluginInfo {
    /// Size of this struct as the plugin understands it
    pub struct_size: u32,
    /// Minimum accepted packed ABI version; zero means unbounded
    pub abi_min_packed: u32,
    /// Maximum accepted packed ABI version; zero means unbounded
    pub abi_max_packed: u32,
    /// Descriptive plugin name; may be null
    pub plugin_name: *const c_char,
    /// Descriptive plugin version; may be null
    pub plugin_version: *const c_char,
}

impl PluginInfo {
    /// A zeroed handshake struct with only the size prelude filled in.
    pub fn zeroed() -> Self {
        PluginInfo {
            struct_size: std::mem::size_of::<PluginInfo>() as u32,
            abi_min_packed: 0,
            abi_max_packed: 0,
            plugin_name: std::ptr::null(),
            plugin_version: std::ptr::null(),
        }
    }
}

/// Whether `runtime` falls inside the `[min, max]` range a plugin declares;
/// a zero bound is unbounded on that side.
pub fn abi_in_range(runtime: u32, min: u32, max: u32) -> bool {
    (min == 0 || runtime >= min) && (max == 0 || runtime <= max)
}

type PluginGetInfoFn = unsafe extern "C" fn(*mut PluginInfo) -> i32;
type PluginInitFn = unsafe extern "C" fn(*mut VirtualMachine) -> bool;
type PluginShutdownFn = unsafe extern "C" fn(*mut VirtualMachine);

/// A loaded plugin: the library handle kept alive, the optional shutdown
/// hook, and the originating path.
pub(crate) struct LoadedPlugin {
    _library: Library,
    shutdown: Option<PluginShutdownFn>,
    path: PathBuf,
}

impl VirtualMachine {
    /// Load a plugin library, run the ABI handshake if the plugin offers
    /// one, and call its init entry point. On any failure the library is
    /// unloaded and nothing is recorded.
    pub fn load_plugin(&mut self, path: &Path) -> RuntimeResult<()> {
        let library = unsafe { Library::new(path) }.map_err(|e| {
            RuntimeError::new(
                ErrorKind::PluginInitFailed,
                format!("failed to load plugin library {}: {e}", path.display()),
            )
        })?;

        // Optional handshake: validate the declared ABI range before init.
        let get_info = unsafe { library.get::<PluginGetInfoFn>(b"PluginGetInfo") }
            .ok()
            .map(|symbol| *symbol);
        if let Some(get_info) = get_info {
            let mut info = PluginInfo::zeroed();
            let ok = unsafe { get_info(&mut info) };
            if ok == 0 {
                return Err(RuntimeError::new(
                    ErrorKind::PluginInitFailed,
                    format!("PluginGetInfo failed: {}", path.display()),
                ));
            }
            if !abi_in_range(RUNTIME_ABI_VERSION_PACKED, info.abi_min_packed, info.abi_max_packed) {
                return Err(RuntimeError::new(
                    ErrorKind::AbiIncompatible,
                    format!(
                        "plugin {} requires ABI in [{:#x}, {:#x}], runtime provides {:#x}",
                        path.display(),
                        info.abi_min_packed,
                        info.abi_max_packed,
                        RUNTIME_ABI_VERSION_PACKED
                    ),
                ));
            }
        }

        let init = unsafe { library.get::<PluginInitFn>(b"PluginInit") }
            .map(|symbol| *symbol)
            .map_err(|_| {
                RuntimeError::new(
                    ErrorKind::PluginMissingEntry,
                    format!(
                        "plugin missing required entry point PluginInit: {}",
                        path.display()
                    ),
                )
            })?;

        let ok = unsafe { init(self as *mut VirtualMachine) };
        if !ok {
            return Err(RuntimeError::new(
                ErrorKind::PluginInitFailed,
                format!("plugin init returned false: {}", path.display()),
            ));
        }

        let shutdown = unsafe { library.get::<PluginShutdownFn>(b"PluginShutdown") }
            .ok()
            .map(|symbol| *symbol);

        self.plugins.push(LoadedPlugin {
            _library: library,
            shutdown,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Shut down and unload every plugin in reverse load order.
    pub fn unload_all_plugins(&mut self) {
        while let Some(plugin) = self.plugins.pop() {
            if let Some(shutdown) = plugin.shutdown {
                unsafe { shutdown(self as *mut VirtualMachine) };
            }
            // Dropping the plugin releases the library handle.
        }
    }

    /// Paths of the currently loaded plugins, in load order.
    pub fn loaded_plugin_paths(&self) -> Vec<PathBuf> {
        self.plugins.iter().map(|p| p.path.clone()).collect()
    }
}

impl Drop for VirtualMachine {
    fn drop(&mut self) {
        self.unload_all_plugins();
    }
}
