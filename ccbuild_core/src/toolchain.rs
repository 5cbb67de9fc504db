#![deny(clippy::unwrap_used)]

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    artifact::{self, ObjectFile, SourceFile},
    error::FatalError,
    options::BuildOptions,
    platform::HostOs,
    process::{CommandLine, ProcessRunner},
};

/// Supplies the concrete command lines for a host. The engine treats every
/// command as an opaque `(program, args)` pair.
pub trait Toolchain: Send + Sync {
    fn compile_command(
        &self,
        source: &SourceFile,
        object: &ObjectFile,
        include_dirs: &[PathBuf],
        options: &BuildOptions,
    ) -> CommandLine;

    fn archive_command(&self, archive: &Path, objects: &[ObjectFile]) -> CommandLine;

    fn link_command(
        &self,
        binary: &Path,
        objects: &[ObjectFile],
        libraries: &[PathBuf],
        options: &BuildOptions,
    ) -> CommandLine;

    fn library_artifact(&self, name: &str, out_dir: &Path) -> PathBuf;

    fn binary_artifact(&self, name: &str, out_dir: &Path) -> PathBuf;

    fn object_suffix(&self) -> &'static str;

    fn object_file(&self, source: &SourceFile, out_dir: &Path) -> ObjectFile {
        artifact::object_for_source(source, out_dir, self.object_suffix())
    }
}

/// Builds the toolchain for the current host, resolving `pkg-config` flags
/// for the configured packages up front. On Windows, where `pkg-config` is
/// unavailable, the manifest's static `.lib` list takes its place on the
/// link line.
pub async fn host_toolchain(
    runner: &dyn ProcessRunner,
    packages: &[String],
    windows_libs: &[String],
) -> Result<Arc<dyn Toolchain>, FatalError> {
    match HostOs::current() {
        HostOs::Windows => Ok(Arc::new(
            MsvcToolchain::new().with_extra_link_args(windows_libs.to_vec()),
        )),
        os => {
            let driver = std::env::var("CXX").unwrap_or_else(|_| "c++".to_string());
            let mut toolchain = UnixToolchain::new(os, driver);
            if !packages.is_empty() {
                let cflags = pkg_config(runner, "--cflags", packages).await?;
                let libs = pkg_config(runner, "--libs", packages).await?;
                toolchain = toolchain.with_pkg_config(cflags, libs);
            }
            Ok(Arc::new(toolchain))
        }
    }
}

/// `pkg-config` output is shell-quoted; split it accordingly so include
/// paths containing spaces survive.
async fn pkg_config(
    runner: &dyn ProcessRunner,
    kind: &str,
    packages: &[String],
) -> Result<Vec<String>, FatalError> {
    let mut command = CommandLine::new("pkg-config");
    command.arg(kind).args(packages.iter().map(String::as_str));
    let result = runner.run(&command).await?;
    if !result.success() {
        return Err(FatalError::PkgConfig {
            detail: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }
    let stdout = String::from_utf8_lossy(&result.stdout);
    shlex::split(stdout.trim()).ok_or_else(|| FatalError::PkgConfig {
        detail: format!("unparsable output for {kind}"),
    })
}

/// Driver-style toolchain for Linux and macOS: `$CXX` compiles and links,
/// `ar` archives.
pub struct UnixToolchain {
    os: HostOs,
    driver: String,
    pkg_cflags: Vec<String>,
    pkg_libs: Vec<String>,
}

impl UnixToolchain {
    pub fn new(os: HostOs, driver: impl Into<String>) -> Self {
        Self {
            os,
            driver: driver.into(),
            pkg_cflags: Vec::new(),
            pkg_libs: Vec::new(),
        }
    }

    pub fn with_pkg_config(mut self, cflags: Vec<String>, libs: Vec<String>) -> Self {
        self.pkg_cflags = cflags;
        self.pkg_libs = libs;
        self
    }
}

impl Toolchain for UnixToolchain {
    fn compile_command(
        &self,
        source: &SourceFile,
        object: &ObjectFile,
        include_dirs: &[PathBuf],
        options: &BuildOptions,
    ) -> CommandLine {
        let mut command = CommandLine::new(&self.driver);
        command.args([
            "-fcolor-diagnostics",
            "-c",
            "-Werror",
            "-Wno-deprecated",
            "-Wno-missing-braces",
            "-g",
            "-std=c++20",
        ]);
        if self.os == HostOs::Macos {
            command.arg("-I/opt/homebrew/opt/llvm/include");
        }
        command.args(self.pkg_cflags.iter().map(String::as_str));
        for dir in include_dirs {
            let mut flag = std::ffi::OsString::from("-I");
            flag.push(dir.as_os_str());
            command.arg(flag);
        }
        if options.asan && self.os == HostOs::Macos {
            command.arg("-fsanitize=address");
        }
        command.arg(&source.path).arg("-o").arg(&object.path);
        command
    }

    fn archive_command(&self, archive: &Path, objects: &[ObjectFile]) -> CommandLine {
        let mut command = CommandLine::new("ar");
        command.arg("-r").arg(archive);
        command.args(objects.iter().map(|o| o.path.as_os_str()));
        command
    }

    fn link_command(
        &self,
        binary: &Path,
        objects: &[ObjectFile],
        libraries: &[PathBuf],
        options: &BuildOptions,
    ) -> CommandLine {
        let mut command = CommandLine::new(&self.driver);
        command.args(objects.iter().map(|o| o.path.as_os_str()));
        command.arg("-o").arg(binary);
        command.arg("-lz");
        match self.os {
            HostOs::Macos => {
                command.args(["-framework", "OpenGL", "-L/opt/homebrew/opt/llvm/lib"]);
            }
            _ => {
                command.arg("-lGL");
            }
        }
        command.args(self.pkg_libs.iter().map(String::as_str));
        command.args(libraries.iter().map(|l| l.as_os_str()));
        if options.asan && self.os == HostOs::Macos {
            command.arg("-fsanitize=address");
        }
        command
    }

    fn library_artifact(&self, name: &str, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("lib{name}.a"))
    }

    fn binary_artifact(&self, name: &str, out_dir: &Path) -> PathBuf {
        out_dir.join(name)
    }

    fn object_suffix(&self) -> &'static str {
        self.os.object_suffix()
    }
}

/// `cl.exe` / `lib.exe` toolchain for Windows.
pub struct MsvcToolchain {
    extra_link_args: Vec<String>,
}

impl MsvcToolchain {
    pub fn new() -> Self {
        Self {
            extra_link_args: Vec::new(),
        }
    }

    pub fn with_extra_link_args(mut self, args: Vec<String>) -> Self {
        self.extra_link_args = args;
        self
    }
}

impl Default for MsvcToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for MsvcToolchain {
    fn compile_command(
        &self,
        source: &SourceFile,
        object: &ObjectFile,
        include_dirs: &[PathBuf],
        _options: &BuildOptions,
    ) -> CommandLine {
        let mut command = CommandLine::new("cl.exe");
        command.args(["/c", "/std:c++20", "/Z7", "/EHsc"]);
        for dir in include_dirs {
            let mut flag = std::ffi::OsString::from("/I");
            flag.push(dir.as_os_str());
            command.arg(flag);
        }
        command.arg(&source.path);
        let mut out_flag = std::ffi::OsString::from("/Fo");
        out_flag.push(object.path.as_os_str());
        command.arg(out_flag);
        command
    }

    fn archive_command(&self, archive: &Path, objects: &[ObjectFile]) -> CommandLine {
        let mut command = CommandLine::new("lib.exe");
        let mut out_flag = std::ffi::OsString::from("/OUT:");
        out_flag.push(archive.as_os_str());
        command.arg(out_flag);
        command.args(objects.iter().map(|o| o.path.as_os_str()));
        command
    }

    fn link_command(
        &self,
        binary: &Path,
        objects: &[ObjectFile],
        libraries: &[PathBuf],
        _options: &BuildOptions,
    ) -> CommandLine {
        let mut command = CommandLine::new("cl.exe");
        command.args(objects.iter().map(|o| o.path.as_os_str()));
        let mut out_flag = std::ffi::OsString::from("/Fe");
        out_flag.push(binary.as_os_str());
        command.arg(out_flag);
        command.args(["/Z7", "/link", "/NODEFAULTLIB:MSVCRT"]);
        command.args(self.extra_link_args.iter().map(String::as_str));
        command.args(libraries.iter().map(|l| l.as_os_str()));
        command
    }

    fn library_artifact(&self, name: &str, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("lib{name}.lib"))
    }

    fn binary_artifact(&self, name: &str, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{name}.exe"))
    }

    fn object_suffix(&self) -> &'static str {
        HostOs::Windows.object_suffix()
    }
}
