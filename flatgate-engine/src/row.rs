use crate::store::TypeMode;
use std::fmt;

/// One normalized policy row: the 22-column CSV record every later stage
/// consumes. `Display` renders the exact output line.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyRow {
    pub dom: String,
    pub sintf: String,
    pub dintf: String,
    pub poltype: TypeMode,
    pub polid: String,
    pub polname: String,
    /// 1-based order of the owning policy within its type-mode list.
    pub polline: usize,
    pub action: String,
    pub prot: String,
    pub saddr: String,
    pub sport: String,
    pub daddr: String,
    pub dport: String,
    pub sdaddr: String,
    pub itpcd: String,
    pub saneg: String,
    pub daneg: String,
    pub svneg: String,
    pub status: String,
    pub log: String,
    pub schedule: String,
    pub comment: String,
}

impl fmt::Display for PolicyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.dom,
            self.sintf,
            self.dintf,
            self.poltype.as_str(),
            self.polid,
            self.polname,
            self.polline,
            self.action,
            self.prot,
            self.saddr,
            self.sport,
            self.daddr,
            self.dport,
            self.sdaddr,
            self.itpcd,
            self.saneg,
            self.daneg,
            self.svneg,
            self.status,
            self.log,
            self.schedule,
            self.comment
        )
    }
}
