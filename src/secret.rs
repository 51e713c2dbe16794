//! Loads the master secret from a TOML secrets file.
//!
//! The file holds a single `secret` key with the 16-byte master secret.
//! No secret material ships with this crate; it must be provided
//! externally (see `secrets.toml.example`).

use std::{fs, io};

use crate::key::{Key, KEY_LENGTH};

pub fn check(secret_file: &str) -> io::Result<()> {
    // Prevent out-of-memory condition: the secrets file should be small.
    let attributes = fs::metadata(secret_file)?;
    let file_size = attributes.len();

    if file_size > 1024 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{secret_file} is too large"),
        ));
    }

    Ok(())
}

pub fn load(secret_file: &str) -> io::Result<Key> {
    check(secret_file)?;

    let contents = fs::read_to_string(secret_file)?;
    let value = contents.parse::<toml::Value>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{secret_file} format is invalid: {e}"),
        )
    })?;

    match value.get("secret").and_then(toml::Value::as_str) {
        Some(secret) => {
            let chars = secret.chars().count();
            if chars != KEY_LENGTH {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("secret should be {KEY_LENGTH} characters long but is {chars}"),
                ));
            }

            secret.parse::<Key>().map_err(io::Error::from)
        }
        None => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{secret_file} does not contain a secret"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct TempSecrets(PathBuf);

    impl TempSecrets {
        fn write(name: &str, contents: &str) -> Self {
            let path = std::env::temp_dir().join(format!("dzmedia-{name}-{}", std::process::id()));
            fs::write(&path, contents).unwrap();
            Self(path)
        }

        fn path(&self) -> &str {
            self.0.to_str().unwrap()
        }
    }

    impl Drop for TempSecrets {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    #[test]
    fn loads_a_valid_secret() {
        let file = TempSecrets::write("valid", "secret = \"0123456789abcdef\"\n");
        let key = load(file.path()).unwrap();
        assert_eq!(*key, *b"0123456789abcdef");
    }

    #[test]
    fn rejects_wrong_length() {
        let file = TempSecrets::write("short", "secret = \"too-short\"\n");
        assert!(load(file.path()).is_err());
    }

    #[test]
    fn rejects_missing_secret() {
        let file = TempSecrets::write("missing", "something_else = 1\n");
        assert!(load(file.path()).is_err());
    }

    #[test]
    fn rejects_oversized_file() {
        let padding = format!("# {}\n", "x".repeat(2048));
        let file = TempSecrets::write("large", &padding);
        assert!(load(file.path()).is_err());
    }
}
