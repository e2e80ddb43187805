use std::{fmt::Debug, io::BufWriter, path::PathBuf};

use anyhow::Context;
use fs_err::File;
use serde::{Deserialize, Serialize};

pub fn write_json_pretty<P: Into<PathBuf>, T: Serialize>(path: P, value: &T) -> anyhow::Result<()> {
    Ok(serde_json::to_writer_pretty(
        BufWriter::new(File::create(path)?),
        value,
    )?)
}

pub fn read_toml<P: Into<PathBuf> + Debug, T: for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    (|| toml::from_str(&fs_err::read_to_string(&path)?).map_err(anyhow::Error::new))().with_context(
        || {
            format!(
                "While trying to parse {path:?} as {}",
                std::any::type_name::<T>()
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::read_toml;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_read_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.toml");
        fs_err::write(&path, "name = \"abc\"\ncount = 3\n").unwrap();
        let sample: Sample = read_toml(&path).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "abc".to_owned(),
                count: 3
            }
        );

        fs_err::write(&path, "name = 1").unwrap();
        let err = read_toml::<_, Sample>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("While trying to parse"));
    }
}
