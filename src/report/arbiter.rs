//! Flags that keep the two sync directions from feeding each other.

use std::collections::HashSet;

/// Fields that are rendered and parsed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Date,
    Specialty,
    Indicators,
    Complaints,
    Consent,
    Objective,
    Surdology,
    Diagnosis,
    Recommendations,
    Repeat,
    SickLeave,
    Signature,
    Operation,
    OpStaff,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 14] = [
        FieldGroup::Date,
        FieldGroup::Specialty,
        FieldGroup::Indicators,
        FieldGroup::Complaints,
        FieldGroup::Consent,
        FieldGroup::Objective,
        FieldGroup::Surdology,
        FieldGroup::Diagnosis,
        FieldGroup::Recommendations,
        FieldGroup::Repeat,
        FieldGroup::SickLeave,
        FieldGroup::Signature,
        FieldGroup::Operation,
        FieldGroup::OpStaff,
    ];
}

#[derive(Debug, Default)]
pub struct UpdateArbiter {
    updating: HashSet<FieldGroup>,
    checking_content: bool,
    programmatic_update: bool,
    rebuilding: bool,
    paginating: bool,
}

impl UpdateArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a group for a forward update. Refused while a parse pass runs
    /// or when the group is already being written.
    pub fn begin_update(&mut self, group: FieldGroup) -> bool {
        if self.checking_content || self.updating.contains(&group) {
            return false;
        }
        self.updating.insert(group);
        true
    }

    pub fn end_update(&mut self, group: FieldGroup) {
        self.updating.remove(&group);
    }

    pub fn is_updating(&self, group: FieldGroup) -> bool {
        self.updating.contains(&group)
    }

    pub fn begin_rebuild(&mut self) -> bool {
        if self.rebuilding {
            return false;
        }
        self.rebuilding = true;
        self.programmatic_update = true;
        true
    }

    pub fn end_rebuild(&mut self) {
        self.rebuilding = false;
        self.programmatic_update = false;
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding
    }

    pub fn set_programmatic(&mut self, on: bool) {
        self.programmatic_update = on;
    }

    pub fn is_programmatic(&self) -> bool {
        self.programmatic_update
    }

    /// Claims the reverse direction. Refused while any other flag is set.
    pub fn begin_parse(&mut self) -> bool {
        if self.checking_content
            || self.programmatic_update
            || self.rebuilding
            || self.paginating
            || !self.updating.is_empty()
        {
            return false;
        }
        self.checking_content = true;
        true
    }

    pub fn end_parse(&mut self) {
        self.checking_content = false;
    }

    pub fn is_checking_content(&self) -> bool {
        self.checking_content
    }

    pub fn begin_paginate(&mut self) -> bool {
        if self.paginating {
            return false;
        }
        self.paginating = true;
        true
    }

    pub fn end_paginate(&mut self) {
        self.paginating = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_is_refused_during_parse() {
        let mut arbiter = UpdateArbiter::new();
        assert!(arbiter.begin_parse());
        assert!(!arbiter.begin_update(FieldGroup::Date));
        arbiter.end_parse();
        assert!(arbiter.begin_update(FieldGroup::Date));
        assert!(!arbiter.begin_update(FieldGroup::Date));
        assert!(arbiter.begin_update(FieldGroup::Objective));
    }

    #[test]
    fn parse_is_refused_while_any_flag_is_set() {
        let mut arbiter = UpdateArbiter::new();
        assert!(arbiter.begin_update(FieldGroup::Signature));
        assert!(!arbiter.begin_parse());
        arbiter.end_update(FieldGroup::Signature);

        assert!(arbiter.begin_rebuild());
        assert!(arbiter.is_programmatic());
        assert!(!arbiter.begin_rebuild());
        assert!(!arbiter.begin_parse());
        arbiter.end_rebuild();
        assert!(arbiter.begin_parse());
    }

    #[test]
    fn pagination_does_not_reenter() {
        let mut arbiter = UpdateArbiter::new();
        assert!(arbiter.begin_paginate());
        assert!(!arbiter.begin_paginate());
        arbiter.end_paginate();
        assert!(arbiter.begin_paginate());
    }
}
