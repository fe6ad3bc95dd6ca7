//! Directory sweep: decode every RINEX source in a directory into
//! one container per input.
use crate::{container, error::Error, Loaded, Options};
use std::path::Path;

/// Decodes every regular file in `dir` and writes `<stem>.rnz`
/// containers under `out`. Individual failures are logged and the
/// sweep continues; the count of converted sources comes back.
pub fn convert_directory(dir: &Path, out: &Path, opts: &Options) -> Result<usize, Error> {
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    std::fs::create_dir_all(out)?;

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut converted = 0;
    for path in entries {
        match convert_one(&path, out, opts) {
            Ok(()) => converted += 1,
            Err(e) => log::error!("{}: {}", path.display(), e),
        }
    }
    Ok(converted)
}

fn convert_one(path: &Path, out: &Path, opts: &Options) -> Result<(), Error> {
    let loaded = crate::load(path, opts)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| Error::InvalidInput(format!("{} has no file stem", path.display())))?;
    let target = out.join(format!("{}.{}", stem, container::CONTAINER_EXTENSION));
    match &loaded {
        Loaded::Obs(a) => container::save(&target, Some(a), None),
        Loaded::Nav(a) => container::save(&target, None, Some(a)),
        Loaded::Both { obs, nav } => container::save(&target, Some(obs), Some(nav)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::array::RecordKind;

    const OBS: &str = "     2.11           OBSERVATION DATA                        RINEX VERSION / TYPE
     1    C1                                                # / TYPES OF OBSERV
  2010     3     5     0     0    0.0000000     GPS         TIME OF FIRST OBS
                                                            END OF HEADER
 10  3  5  0  0  0.0000000  0  1G07
  20147683.700
";

    #[test]
    fn sweep_converts_and_continues() {
        let dir = std::env::temp_dir().join("rinexload-batch-in");
        let out = std::env::temp_dir().join("rinexload-batch-out");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("site0640.10o"), OBS).unwrap();
        std::fs::write(dir.join("broken.10o"), "not a rinex file at all").unwrap();

        let n = convert_directory(&dir, &out, &Options::default()).unwrap();
        assert_eq!(n, 1);
        let a = container::read_group(&out.join("site0640.rnz"), RecordKind::Obs).unwrap();
        assert_eq!(a.sv, vec!["G07"]);
        assert!(!out.join("broken.rnz").exists());

        std::fs::remove_dir_all(&dir).ok();
        std::fs::remove_dir_all(&out).ok();
    }

    #[test]
    fn not_a_directory() {
        let r = convert_directory(
            Path::new("/no/such/dir"),
            Path::new("/tmp"),
            &Options::default(),
        );
        assert!(matches!(r, Err(Error::InvalidInput(_))));
    }
}
