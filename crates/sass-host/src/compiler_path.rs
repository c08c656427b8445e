//! Locates the embedded compiler binary for the current platform.
//!
//! Resolution order: the `SASS_EMBEDDED_COMPILER_PATH` override (for
//! development against a locally built compiler), then the packaged
//! `sass-embedded/<platform>-<arch>/` directory beside the current
//! executable, then plain `PATH` lookup.

use crate::{Error, Result};
use std::path::PathBuf;

pub(crate) const COMPILER_PATH_VAR: &str = "SASS_EMBEDDED_COMPILER_PATH";

/// The path of the compiler binary to launch.
pub(crate) fn resolve() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(COMPILER_PATH_VAR) {
        return Ok(PathBuf::from(path));
    }

    if let Some(program) = packaged_compiler()? {
        return Ok(program);
    }

    // Fall back to PATH resolution at spawn time.
    Ok(PathBuf::from(binary_name()))
}

fn packaged_compiler() -> Result<Option<PathBuf>> {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(_) => return Ok(None),
    };
    let Some(dir) = exe.parent() else {
        return Ok(None);
    };
    let candidate = dir
        .join("sass-embedded")
        .join(platform_dir()?)
        .join(binary_name());
    Ok(candidate.is_file().then(|| candidate))
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "sass.bat"
    } else {
        "sass"
    }
}

/// The release directory name for this platform, e.g. `linux-x64` or
/// `linux-musl-arm64`.
fn platform_dir() -> Result<String> {
    let os = match std::env::consts::OS {
        "linux" if is_musl() => "linux-musl",
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "win32",
        "android" => "android",
        other => return Err(Error::UnsupportedPlatform(other.to_string())),
    };
    let arch = match std::env::consts::ARCH {
        "x86" => "ia32",
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "arm" => "arm",
        "riscv64" => "riscv64",
        other => return Err(Error::UnsupportedPlatform(format!("{os}-{other}"))),
    };
    Ok(format!("{os}-{arch}"))
}

#[cfg(target_os = "linux")]
fn is_musl() -> bool {
    lazy_static::lazy_static! {
        static ref IS_MUSL: bool = match elf_interpreter("/proc/self/exe") {
            Some(interp) => interp
                .rsplit('/')
                .next()
                .map_or(false, |base| base.starts_with("ld-musl-")),
            None => false,
        };
    }
    *IS_MUSL
}

#[cfg(not(target_os = "linux"))]
fn is_musl() -> bool {
    false
}

/// Read the PT_INTERP path (the dynamic linker) from an ELF executable.
/// Returns None for static binaries and anything that doesn't parse.
#[cfg(target_os = "linux")]
fn elf_interpreter(path: &str) -> Option<String> {
    use std::os::unix::fs::FileExt;

    let file = std::fs::File::open(path).ok()?;

    let mut ident = [0u8; 16];
    file.read_exact_at(&mut ident, 0).ok()?;
    if &ident[..4] != b"\x7fELF" {
        return None;
    }
    let is_64 = match ident[4] {
        1 => false,
        2 => true,
        _ => return None,
    };
    if ident[5] != 1 {
        // Big-endian ELF on Linux would be exotic; don't guess.
        return None;
    }

    let mut header = [0u8; 48];
    file.read_exact_at(&mut header, 16).ok()?;
    let u16_at = |buf: &[u8], at: usize| u16::from_le_bytes([buf[at], buf[at + 1]]);

    // Offsets within the ELF header, after the 16-byte ident.
    let (e_phoff, e_phentsize, e_phnum) = if is_64 {
        let e_phoff = u64::from_le_bytes(header[16..24].try_into().ok()?);
        (e_phoff, u16_at(&header, 38), u16_at(&header, 40))
    } else {
        let e_phoff = u32::from_le_bytes(header[12..16].try_into().ok()?) as u64;
        (e_phoff, u16_at(&header, 26), u16_at(&header, 28))
    };

    const PT_INTERP: u32 = 3;
    for index in 0..e_phnum as u64 {
        let mut entry = vec![0u8; e_phentsize as usize];
        file.read_exact_at(&mut entry, e_phoff + index * e_phentsize as u64)
            .ok()?;
        let p_type = u32::from_le_bytes(entry[0..4].try_into().ok()?);
        if p_type != PT_INTERP {
            continue;
        }
        let (p_offset, p_filesz) = if is_64 {
            (
                u64::from_le_bytes(entry[8..16].try_into().ok()?),
                u64::from_le_bytes(entry[32..40].try_into().ok()?),
            )
        } else {
            (
                u32::from_le_bytes(entry[4..8].try_into().ok()?) as u64,
                u32::from_le_bytes(entry[16..20].try_into().ok()?) as u64,
            )
        };

        let mut interp = vec![0u8; p_filesz as usize];
        file.read_exact_at(&mut interp, p_offset).ok()?;
        // The segment is a NUL-terminated path.
        while interp.last() == Some(&0) {
            interp.pop();
        }
        return String::from_utf8(interp).ok();
    }
    None
}
