use std::fmt;

/// Read/write/execute flags for one class of users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triad {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Triad {
    fn from_bits(bits: u32) -> Self {
        Self {
            read: bits & 0o4 != 0,
            write: bits & 0o2 != 0,
            execute: bits & 0o1 != 0,
        }
    }

    fn as_row(self) -> [bool; 3] {
        [self.read, self.write, self.execute]
    }
}

/// User/group/others permission grid derived from mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRights {
    pub user: Triad,
    pub group: Triad,
    pub others: Triad,
}

impl AccessRights {
    pub fn from_mode(mode: u32) -> Self {
        Self {
            user: Triad::from_bits(mode >> 6),
            group: Triad::from_bits(mode >> 3),
            others: Triad::from_bits(mode),
        }
    }

    /// Rows are user, group, others; columns are read, write, execute.
    pub fn grid(&self) -> [[bool; 3]; 3] {
        [self.user.as_row(), self.group.as_row(), self.others.as_row()]
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

impl fmt::Display for AccessRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [("User", self.user), ("Group", self.group), ("Others", self.others)];
        for (i, (label, t)) in rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}: Read - {} Write - {} Exec - {}",
                label,
                yes_no(t.read),
                yes_no(t.write),
                yes_no(t.execute)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rwxr_x_grid() {
        // rwxr-x---
        let rights = AccessRights::from_mode(0o750);
        assert_eq!(
            rights.grid(),
            [[true, true, true], [true, false, true], [false, false, false]]
        );
    }

    #[test]
    fn test_ignores_type_bits() {
        assert_eq!(
            AccessRights::from_mode(0o100644),
            AccessRights::from_mode(0o644)
        );
    }

    #[test]
    fn test_display_layout() {
        let text = AccessRights::from_mode(0o640).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "User: Read - yes Write - yes Exec - no",
                "Group: Read - yes Write - no Exec - no",
                "Others: Read - no Write - no Exec - no",
            ]
        );
    }
}
