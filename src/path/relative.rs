//! Offset arithmetic between paths.

use super::{PARENT, Path, PathError};

/// Resolve `relative` against `base`, popping one base segment per `..`.
///
/// For example, base `/home/user/project` and relative `../otherproject/src`
/// give `/home/otherproject/src`. An absolute `relative` is returned as-is.
pub fn find_relative(base: &Path, relative: &Path) -> Result<Path, PathError> {
    if !relative.relative {
        return Ok(relative.clone());
    }

    let floor = base.root_len();
    let mut segments = base.segments.clone();
    for segment in &relative.segments {
        match segment.as_str() {
            PARENT => {
                if segments.len() <= floor {
                    return Err(PathError::EscapesRoot {
                        base: base.to_string(),
                        relative: relative.to_string(),
                    });
                }
                segments.pop();
            }
            _ => segments.push(segment.clone()),
        }
    }

    Ok(Path {
        segments,
        relative: base.relative,
        windows: base.windows,
    })
}

/// Compute the relative path that leads from directory `from_dir` to `to`.
///
/// This is the inverse of [`find_relative`]: for absolute paths on the same
/// root, `find_relative(from_dir, relative_to(from_dir, to)) == to`. Windows
/// segments compare case-insensitively.
pub fn relative_to(from_dir: &Path, to: &Path) -> Result<Path, PathError> {
    for path in [from_dir, to] {
        if path.relative {
            return Err(PathError::NotAbsolute(path.to_string()));
        }
    }

    let same_drive = from_dir.drive().map(|c| c.to_ascii_uppercase())
        == to.drive().map(|c| c.to_ascii_uppercase());
    if from_dir.windows != to.windows || !same_drive {
        return Err(PathError::DifferentRoots {
            from: from_dir.to_string(),
            to: to.to_string(),
        });
    }

    let windows = from_dir.windows;
    let common = from_dir
        .segments
        .iter()
        .zip(&to.segments)
        .take_while(|(a, b)| same_segment(a, b, windows))
        .count();

    let segments = std::iter::repeat_n(PARENT.to_string(), from_dir.segments.len() - common)
        .chain(to.segments.iter().skip(common).cloned())
        .collect();

    Ok(Path {
        segments,
        relative: true,
        windows,
    })
}

fn same_segment(a: &str, b: &str, windows: bool) -> bool {
    if windows {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posix(text: &str) -> Path {
        Path::parse(text, false).unwrap()
    }

    fn windows(text: &str) -> Path {
        Path::parse(text, true).unwrap()
    }

    #[test]
    fn test_find_relative_single_parent() {
        let result = find_relative(&posix("/home/user/project"), &posix("../otherproject/src"));
        assert_eq!(result.unwrap(), posix("/home/otherproject/src"));
    }

    #[test]
    fn test_find_relative_two_parents() {
        let result = find_relative(
            &posix("/home/user/project"),
            &posix("../../otherproject/src"),
        );
        let resolved = result.unwrap();
        assert_eq!(resolved.segments(), &["home", "otherproject", "src"]);
        assert!(!resolved.is_relative());
    }

    #[test]
    fn test_find_relative_without_parents_appends() {
        let result = find_relative(&posix("/proj"), &posix("node_modules/@group"));
        assert_eq!(result.unwrap(), posix("/proj/node_modules/@group"));
    }

    #[test]
    fn test_find_relative_to_root() {
        let result = find_relative(&posix("/a/b"), &posix("../.."));
        assert!(result.unwrap().is_root());
    }

    #[test]
    fn test_find_relative_escapes_root() {
        let result = find_relative(&posix("/a/b"), &posix("../../../c"));
        assert!(matches!(result, Err(PathError::EscapesRoot { .. })));
    }

    #[test]
    fn test_find_relative_windows_drive_is_floor() {
        let base = windows(r"C:\work");
        assert_eq!(
            find_relative(&base, &windows(r"..\shared")).unwrap(),
            windows(r"C:\shared")
        );
        assert!(matches!(
            find_relative(&base, &windows(r"..\..\shared")),
            Err(PathError::EscapesRoot { .. })
        ));
    }

    #[test]
    fn test_find_relative_absolute_passthrough() {
        let result = find_relative(&posix("/home/user"), &posix("/usr/local"));
        assert_eq!(result.unwrap(), posix("/usr/local"));
    }

    #[test]
    fn test_find_relative_parsed_current_segments() {
        // `parse` drops `.` before resolution
        assert_eq!(
            find_relative(&posix("/opt"), &posix("./lib/./x")).unwrap(),
            posix("/opt/lib/x")
        );
    }

    #[test]
    fn test_relative_to_sibling_tree() {
        // node_modules/@test inside /ws/apps/proj, target in /ws/apps/test-project
        let result = relative_to(
            &posix("/ws/apps/proj/node_modules/@test"),
            &posix("/ws/apps/test-project/src"),
        );
        assert_eq!(result.unwrap(), posix("../../../test-project/src"));
    }

    #[test]
    fn test_relative_to_child() {
        let result = relative_to(&posix("/ws/proj"), &posix("/ws/proj/src"));
        assert_eq!(result.unwrap(), posix("src"));
    }

    #[test]
    fn test_relative_to_same_dir() {
        let result = relative_to(&posix("/ws/proj"), &posix("/ws/proj")).unwrap();
        assert!(result.segments().is_empty());
        assert_eq!(result.to_string(), ".");
    }

    #[test]
    fn test_relative_to_partial_segment_match() {
        // "/ws/app" is not a prefix of "/ws/apps"
        let result = relative_to(&posix("/ws/app/x"), &posix("/ws/apps/y"));
        assert_eq!(result.unwrap(), posix("../../apps/y"));
    }

    #[test]
    fn test_relative_to_windows_case_insensitive() {
        let result = relative_to(&windows(r"C:\Work\proj"), &windows(r"c:\work\shared"));
        assert_eq!(result.unwrap(), windows(r"..\shared"));
    }

    #[test]
    fn test_relative_to_different_drives() {
        let result = relative_to(&windows(r"C:\work"), &windows(r"D:\work"));
        assert!(matches!(result, Err(PathError::DifferentRoots { .. })));
    }

    #[test]
    fn test_relative_to_different_platforms() {
        let result = relative_to(&posix("/work"), &windows(r"\work"));
        assert!(matches!(result, Err(PathError::DifferentRoots { .. })));
    }

    #[test]
    fn test_relative_to_requires_absolute() {
        let result = relative_to(&posix("work"), &posix("/work"));
        assert!(matches!(result, Err(PathError::NotAbsolute(_))));
    }

    #[test]
    fn test_roundtrip_relative_path() {
        let from = posix("/home/user/.ws/apps/proj/node_modules/@scope");
        let target = posix("/home/user/.ws/libs/core/src");

        let relative = relative_to(&from, &target).unwrap();
        assert_eq!(relative, posix("../../../../libs/core/src"));
        assert_eq!(find_relative(&from, &relative).unwrap(), target);
    }
}
