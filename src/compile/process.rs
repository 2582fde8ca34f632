//! External compiler command

use crate::compile::{CompilerInstance, SourceCompiler};
use crate::diagnostics::BuildLog;
use crate::error::{KilnError, KilnResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Max number of output lines to include in compilation error messages.
const COMPILE_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of compiler output for error diagnostics.
fn compile_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > COMPILE_ERROR_TAIL_LINES {
        lines[total - COMPILE_ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// Runs `<program> [extra args] -classpath <cp> -d <output> <sources...>`
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    program: String,
    extra_args: Vec<String>,
}

impl ProcessCompiler {
    pub fn new(program: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            extra_args,
        }
    }

    /// Prefer `<home>/bin/<program>` when the compiler home has one
    fn program_for(&self, compiler: &CompilerInstance) -> PathBuf {
        let program = Path::new(&self.program);
        if program.is_relative() && program.components().count() == 1 {
            if let Some(ref home) = compiler.home {
                let candidate = home.join("bin").join(program);
                if candidate.is_file() {
                    return candidate;
                }
            }
        }
        program.to_path_buf()
    }

    fn classpath(interface_files: &[PathBuf], compiler: &CompilerInstance) -> KilnResult<String> {
        let joined = std::env::join_paths(interface_files.iter().chain(compiler.jars.iter()))
            .map_err(|e| KilnError::User(format!("Invalid classpath entry: {}", e)))?;
        Ok(joined.to_string_lossy().into_owned())
    }
}

#[async_trait]
impl SourceCompiler for ProcessCompiler {
    async fn compile_bridge(
        &self,
        sources: &[PathBuf],
        output_jar: &Path,
        interface_files: &[PathBuf],
        display_name: &str,
        compiler: &CompilerInstance,
        log: &dyn BuildLog,
    ) -> KilnResult<()> {
        let program = self.program_for(compiler);
        let classpath = Self::classpath(interface_files, compiler)?;

        let mut cmd = Command::new(&program);
        cmd.args(&self.extra_args)
            .arg("-classpath")
            .arg(&classpath)
            .arg("-d")
            .arg(output_jar)
            .args(sources);

        log.info(&format!(
            "Compiling {} for compiler {}",
            display_name, compiler.actual_version
        ));
        log.debug(&format!("Running {:?}", cmd.as_std()));

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                KilnError::CompilerNotFound {
                    program: program.display().to_string(),
                    source: e,
                }
            } else {
                KilnError::io(format!("running {}", program.display()), e)
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            log.debug(line);
        }

        if !output.status.success() {
            return Err(KilnError::Compilation {
                display_name: display_name.to_string(),
                code: output.status.code(),
                output: compile_error_output(&stdout, &stderr),
            });
        }

        if !output_jar.is_file() {
            return Err(KilnError::Compilation {
                display_name: display_name.to_string(),
                code: output.status.code(),
                output: format!("compiler produced no output at {}", output_jar.display()),
            });
        }

        Ok(())
    }
}
