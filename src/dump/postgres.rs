//! PostgreSQL client tools (`pg_dump`, `pg_restore`, `psql`)
//!
//! Dumps use the custom archive format so that `pg_restore` can clean and
//! recreate objects. The password is handed to every tool through
//! `PGPASSWORD`, never on the command line.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Output};

use crate::config::PostgresSettings;
use crate::error::{BackupError, BackupResult};

use super::DumpInvoker;

const LIST_DATABASES_SQL: &str =
    "SELECT datname FROM pg_database WHERE NOT datistemplate AND datallowconn ORDER BY datname";

/// Shells out to the PostgreSQL client binaries found on `PATH`
pub struct PgTools {
    settings: PostgresSettings,
}

impl PgTools {
    pub fn new(settings: PostgresSettings) -> Self {
        Self { settings }
    }

    fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-h")
            .arg(&self.settings.host)
            .arg("-p")
            .arg(self.settings.port.to_string())
            .arg("-U")
            .arg(&self.settings.user)
            .env("PGPASSWORD", self.settings.password.as_str());
        cmd
    }

    fn list_command(&self) -> Command {
        let mut cmd = self.command("psql");
        cmd.arg("-d")
            .arg(&self.settings.maintenance_database)
            .args(["--no-psqlrc", "-At", "-c", LIST_DATABASES_SQL]);
        cmd
    }

    fn dump_command(&self, database: &str, output: &Path) -> Command {
        let mut cmd = self.command("pg_dump");
        cmd.arg("--format=custom")
            .arg("-d")
            .arg(database)
            .arg("--file")
            .arg(output)
            .args(&self.settings.dump_extra_opts);
        cmd
    }

    fn restore_command(&self, database: &str, input: &Path, create: bool) -> Command {
        let mut cmd = self.command("pg_restore");
        cmd.args(["--clean", "--if-exists"]);
        if create {
            // The archive names the database; connect to the maintenance
            // database so it can be dropped and recreated.
            cmd.arg("--create")
                .arg("-d")
                .arg(&self.settings.maintenance_database);
        } else {
            cmd.arg("-d").arg(database);
        }
        cmd.arg(input);
        cmd
    }
}

impl DumpInvoker for PgTools {
    fn list_databases(&self) -> BackupResult<Vec<String>> {
        let output = run(self.list_command()).map_err(BackupError::Dump)?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn dump(&self, database: &str, output: &Path) -> BackupResult<()> {
        tracing::info!(database = %database, "Dumping database");
        run(self.dump_command(database, output)).map_err(BackupError::Dump)?;
        Ok(())
    }

    fn restore(&self, database: &str, input: &Path, create: bool) -> BackupResult<()> {
        tracing::info!(database = %database, create, "Restoring database");
        run(self.restore_command(database, input, create)).map_err(BackupError::Restore)?;
        Ok(())
    }
}

/// Run a command to completion, turning spawn failures and non-zero exits
/// into a message that includes the tool's stderr
fn run(mut cmd: Command) -> Result<Output, String> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let output = cmd
        .output()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        ));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> PgTools {
        PgTools::new(PostgresSettings {
            host: "db.internal".into(),
            port: 5433,
            user: "admin".into(),
            password: "pw".into(),
            maintenance_database: "postgres".into(),
            dump_extra_opts: vec!["--no-owner".into()],
        })
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a: &OsStr| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_dump_command() {
        let cmd = tools().dump_command("app", Path::new("/tmp/app.dump"));
        assert_eq!(cmd.get_program(), "pg_dump");
        assert_eq!(
            args(&cmd),
            vec![
                "-h",
                "db.internal",
                "-p",
                "5433",
                "-U",
                "admin",
                "--format=custom",
                "-d",
                "app",
                "--file",
                "/tmp/app.dump",
                "--no-owner"
            ]
        );
    }

    #[test]
    fn test_password_passed_through_env() {
        let cmd = tools().dump_command("app", Path::new("/tmp/app.dump"));
        let password = cmd
            .get_envs()
            .find(|(key, _)| *key == "PGPASSWORD")
            .and_then(|(_, value)| value);
        assert_eq!(password, Some(OsStr::new("pw")));
        assert!(!args(&cmd).contains(&"pw".to_string()));
    }

    #[test]
    fn test_restore_command_into_existing_database() {
        let cmd = tools().restore_command("app", Path::new("/tmp/app.dump"), false);
        let args = args(&cmd);
        assert!(args.ends_with(&[
            "--clean".to_string(),
            "--if-exists".to_string(),
            "-d".to_string(),
            "app".to_string(),
            "/tmp/app.dump".to_string(),
        ]));
    }

    #[test]
    fn test_restore_command_with_create() {
        let cmd = tools().restore_command("app", Path::new("/tmp/app.dump"), true);
        let args = args(&cmd);
        assert!(args.contains(&"--create".to_string()));
        let d = args.iter().position(|a| a == "-d").unwrap();
        assert_eq!(args[d + 1], "postgres");
    }

    #[test]
    fn test_list_command_uses_maintenance_database() {
        let cmd = tools().list_command();
        assert_eq!(cmd.get_program(), "psql");
        let args = args(&cmd);
        assert!(args.contains(&"-At".to_string()));
        assert!(args.contains(&LIST_DATABASES_SQL.to_string()));
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let err = run(Command::new("pgbackup-no-such-binary")).unwrap_err();
        assert!(err.contains("Failed to start"));
    }
}
