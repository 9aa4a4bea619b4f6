//! Guest kernel command line.

use std::fmt;

use serde::Serialize;

/// Fixed arguments, in the order the guest receives them. The console must stay first.
pub const BASE_ARGS: [&str; 6] = [
    "console=ttyAMA0",
    "lpj=19988480",
    "norandmaps",
    "root=/dev/vda1",
    "rw",
    "init=/home/ubuntu/guestinit.sh",
];

/// The fixed argument list plus at most one caller-supplied suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct KernelCommandLine {
    append: Option<String>,
}

impl KernelCommandLine {
    /// Builds the command line; an empty or whitespace-only `append` is dropped.
    pub fn new(append: Option<&str>) -> Self {
        let append = append
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);
        Self { append }
    }

    /// Every argument in order, the suffix last.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        BASE_ARGS.iter().copied().chain(self.append.as_deref())
    }

    /// Caller-supplied suffix.
    pub fn append(&self) -> Option<&str> {
        self.append.as_deref()
    }
}

impl fmt::Display for KernelCommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(arg)?;
        }
        Ok(())
    }
}

impl From<KernelCommandLine> for String {
    fn from(cmdline: KernelCommandLine) -> Self {
        cmdline.to_string()
    }
}
