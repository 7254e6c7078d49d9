use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::users::model::{Gender, User, UserStatus};

/// Inclusive creation-date range; the `to` bound covers the entire day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Client-side filters for the user table.
///
/// Each vector is a multi-select: empty means "no constraint", otherwise a
/// user must match one of the selected values. The search term matches
/// case-insensitively against name, email, phone number and national id.
#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    pub search: String,
    pub status: Vec<UserStatus>,
    pub gender: Vec<Gender>,
    pub adult: Vec<bool>,
    pub email_verified: Vec<bool>,
    pub phone_verified: Vec<bool>,
    pub created: DateRange,
}

impl UserFilters {
    /// Whether a user passes every active filter
    pub fn matches(&self, user: &User) -> bool {
        if !self.search.is_empty() {
            let term = self.search.to_lowercase();
            let fields = [
                user.full_name(),
                user.email.clone().unwrap_or_default(),
                user.phone_number.clone(),
                user.national_id.clone(),
            ];
            if !fields.iter().any(|f| f.to_lowercase().contains(&term)) {
                return false;
            }
        }

        if !self.status.is_empty() && !self.status.contains(&user.status) {
            return false;
        }

        if !self.gender.is_empty() && !self.gender.contains(&user.gender) {
            return false;
        }

        if !self.adult.is_empty() && !self.adult.contains(&user.adult) {
            return false;
        }

        if !self.email_verified.is_empty() && !self.email_verified.contains(&user.email_verified) {
            return false;
        }

        if !self.phone_verified.is_empty() && !self.phone_verified.contains(&user.phone_verified) {
            return false;
        }

        if !self.created.is_empty() {
            let created = user.created_at.date_naive();
            if let Some(from) = self.created.from {
                if created < from {
                    return false;
                }
            }
            if let Some(to) = self.created.to {
                // Inclusive of the entire end day
                if created > to {
                    return false;
                }
            }
        }

        true
    }

    /// Apply the filters to a user list
    pub fn apply<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        users.iter().filter(|u| self.matches(u)).collect()
    }

    /// Number of active filter groups, shown as the filter badge count
    pub fn active_count(&self) -> usize {
        let mut count = 0;
        if !self.search.is_empty() {
            count += 1;
        }
        if !self.status.is_empty() {
            count += 1;
        }
        if !self.gender.is_empty() {
            count += 1;
        }
        if !self.adult.is_empty() {
            count += 1;
        }
        if !self.email_verified.is_empty() {
            count += 1;
        }
        if !self.phone_verified.is_empty() {
            count += 1;
        }
        if !self.created.is_empty() {
            count += 1;
        }
        count
    }
}

/// Headline counts for the user table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: usize,
    pub active: usize,
    pub suspended: usize,
    /// Users with both phone and email verified
    pub verified: usize,
}

impl UserStats {
    pub fn compute<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let mut stats = Self {
            total: 0,
            active: 0,
            suspended: 0,
            verified: 0,
        };

        for user in users {
            stats.total += 1;
            match user.status {
                UserStatus::Active => stats.active += 1,
                UserStatus::Suspended => stats.suspended += 1,
                UserStatus::Inactive => {}
            }
            if user.fully_verified() {
                stats.verified += 1;
            }
        }

        stats
    }
}
