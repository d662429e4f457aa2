//! Selección de plataforma y construcción de ejecutables.
//!
//! El listado emitido todavía debe ensamblarse y enlazarse para obtener
//! un ejecutable. Ambos pasos se delegan al `cc` del sistema, que lee el
//! ensamblador desde su entrada estándar.

use std::{
    fmt::{self, Display},
    io::BufWriter,
    path::Path,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use crate::{arch::Arch, codegen::CodegenError};
use bitflags::bitflags;
use thiserror::Error;
use tracing::debug;
use unicase::Ascii as NoCase;

bitflags! {
    /// Banderas de enlazado.
    pub struct LinkOptions: u32 {
        /// Pasa `-s` a `cc`.
        const STRIP = 0x01;
    }
}

/// Fallo al ensamblar o enlazar.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LinkerError {
    /// No fue posible lanzar `cc` o comunicarse con él.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// `cc` terminó con un estado distinto de éxito.
    #[error("Linker exited with status code {0:?}")]
    Failed(ExitStatus),
}

/// Plataforma objetivo.
///
/// Una plataforma define tanto la ISA ([`Arch`]) como el sistema
/// operativo, el cual determina la forma de terminar el programa y
/// los parámetros del enlazador.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    /// macOS sobre Apple Silicon.
    DarwinArm64,

    /// Linux sobre x86-64.
    LinuxX86_64,
}

const DARWIN: &[&str] = &["darwin", "macos"];
const LINUX: &[&str] = &["linux"];
const ARM64: &[&str] = &["arm64", "aarch64"];
const X86_64: &[&str] = &["x86_64", "amd64", "x64"];

impl Platform {
    /// Determina la plataforma a partir de nombres de sistema y máquina.
    ///
    /// Los nombres no distinguen mayúsculas de minúsculas, de modo que
    /// tanto `Darwin` como `darwin` son aceptables.
    pub fn detect(system: &str, machine: &str) -> Result<Self, CodegenError> {
        let any = |names: &[&str], name: &str| {
            names
                .iter()
                .any(|&candidate| NoCase::new(candidate) == NoCase::new(name))
        };

        let platform = if any(DARWIN, system) && any(ARM64, machine) {
            Platform::DarwinArm64
        } else if any(LINUX, system) && any(X86_64, machine) {
            Platform::LinuxX86_64
        } else {
            return Err(CodegenError::UnsupportedPlatform {
                system: system.to_owned(),
                machine: machine.to_owned(),
            });
        };

        debug!(%platform, system, machine, "selected platform");
        Ok(platform)
    }

    /// Plataforma sobre la que corre el compilador.
    pub fn host() -> Result<Self, CodegenError> {
        Platform::detect(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// ISA para la cual se emite código en esta plataforma.
    pub fn arch(self) -> Arch {
        match self {
            Platform::DarwinArm64 => Arch::Aarch64,
            Platform::LinuxX86_64 => Arch::X86_64,
        }
    }
}

impl Display for Platform {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::DarwinArm64 => "darwin-arm64",
            Platform::LinuxX86_64 => "linux-x86_64",
        };

        fmt.write_str(name)
    }
}

/// Proceso `cc` en curso que produce un ejecutable.
pub struct Linker {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

impl Linker {
    /// Lanza `cc` con su entrada estándar conectada a un pipe.
    ///
    /// El ejecutable resultante se escribe en `output`.
    pub fn spawn<O>(platform: Platform, output: &O, opts: LinkOptions) -> Result<Self, LinkerError>
    where
        O: AsRef<Path>,
    {
        let params = platform.link_params();

        // El ensamblador llega por stdin
        let mut command = Command::new(params.command);
        command
            .args(params.extra_args)
            .arg("-o")
            .arg(output.as_ref())
            .args(&["-xassembler", "-"])
            .stdin(Stdio::piped());

        if opts.contains(LinkOptions::STRIP) {
            command.arg("-s");
        }

        debug!(?command, "spawning linker");

        let mut child = command.spawn()?;
        let stdin = BufWriter::new(child.stdin.take().expect("linker stdin is piped"));

        Ok(Linker { child, stdin })
    }

    /// Obtiene la entrada estándar del proceso que espera recibir ensamblador.
    pub fn stdin(&mut self) -> &mut BufWriter<ChildStdin> {
        &mut self.stdin
    }

    /// Cierra la entrada y espera a que `cc` termine.
    pub fn finish(mut self) -> Result<(), LinkerError> {
        drop(self.stdin);

        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(LinkerError::Failed(status))
        }
    }
}

/// Invocación de `cc` según la plataforma.
struct Parameters {
    /// Comando de enlazado.
    command: &'static str,

    /// Argumentos propios de la plataforma, previos a `-o`.
    extra_args: &'static [&'static str],
}

impl Platform {
    /// Enumera los detalles del comando de enlazado por plataforma.
    fn link_params(self) -> Parameters {
        match self {
            Platform::DarwinArm64 => Parameters {
                command: "cc",

                // El punto de entrada es `_start` en lugar de `main`, pero
                // Darwin exige enlazar contra libSystem
                extra_args: &["-nostartfiles", "-Wl,-e,_start", "-lSystem"],
            },

            Platform::LinuxX86_64 => Parameters {
                command: "cc",

                // Sin crt ni libc: el programa termina por sí mismo con `exit`
                extra_args: &["-nostdlib", "-static"],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_known_platforms() {
        assert_eq!(Platform::detect("Darwin", "arm64"), Ok(Platform::DarwinArm64));
        assert_eq!(Platform::detect("macos", "aarch64"), Ok(Platform::DarwinArm64));
        assert_eq!(Platform::detect("linux", "x86_64"), Ok(Platform::LinuxX86_64));
        assert_eq!(Platform::detect("Linux", "AMD64"), Ok(Platform::LinuxX86_64));
    }

    #[test]
    fn detect_unknown_platform() {
        let error = Platform::detect("X", "Y").unwrap_err();

        assert_eq!(
            error.to_string(),
            "Could not determine assembly engine for X Y platform"
        );
    }

    #[test]
    fn mismatched_pair_is_unknown() {
        assert!(Platform::detect("darwin", "x86_64").is_err());
        assert!(Platform::detect("linux", "arm64").is_err());
    }

    #[test]
    fn host_matches_detection() {
        assert_eq!(
            Platform::host(),
            Platform::detect(std::env::consts::OS, std::env::consts::ARCH)
        );
    }

    #[test]
    fn platform_arch() {
        assert_eq!(Platform::DarwinArm64.arch(), Arch::Aarch64);
        assert_eq!(Platform::LinuxX86_64.arch(), Arch::X86_64);
    }
}
