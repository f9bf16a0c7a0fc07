use std::fmt;

use chrono::{DateTime, Duration, Utc};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

use crate::notice::Notice;

pub type MemberId = String;
pub type Isbn = String;
pub type TransactionId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Student,
    Faculty,
    Staff,
}

impl MemberType {
    /// Maximum number of books a member of this type may hold at once
    pub fn borrow_limit(&self) -> usize {
        match self {
            MemberType::Student => 3,
            MemberType::Faculty => 5,
            MemberType::Staff => 4,
        }
    }

    /// Number of days a borrowed book may be kept
    pub fn loan_period_days(&self) -> i64 {
        match self {
            MemberType::Student => 5,
            MemberType::Faculty => 7,
            MemberType::Staff => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Student => "student",
            MemberType::Faculty => "faculty",
            MemberType::Staff => "staff",
        }
    }

    /// Case-insensitive parse of user entered text, None for unknown types
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "student" => Some(MemberType::Student),
            "faculty" => Some(MemberType::Faculty),
            "staff" => Some(MemberType::Staff),
            _ => None,
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    Borrowed,
}

impl BookStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "available" => Some(BookStatus::Available),
            "borrowed" => Some(BookStatus::Borrowed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Borrow,
    Return,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Borrow => "borrow",
            TransactionKind::Return => "return",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "borrow" => Some(TransactionKind::Borrow),
            "return" => Some(TransactionKind::Return),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Active,
    Completed,
}

/// State of a transaction as shown to a librarian, overdue is derived from the due date
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    Active,
    Overdue,
    Completed,
}

impl LoanState {
    pub fn label(&self) -> &'static str {
        match self {
            LoanState::Active => "Active",
            LoanState::Overdue => "Overdue",
            LoanState::Completed => "Completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" => Some(LoanState::Active),
            "overdue" => Some(LoanState::Overdue),
            "completed" => Some(LoanState::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub isbn: Isbn,
    pub title: String,
    pub author: String,
    pub category: String,
    pub status: BookStatus,
    pub added_date: DateTime<Utc>,
}

impl Book {
    pub fn new(
        isbn: Isbn,
        title: String,
        author: String,
        category: String,
        added_date: DateTime<Utc>,
    ) -> Self {
        Self {
            isbn,
            title,
            author,
            category,
            status: BookStatus::Available,
            added_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
    /// Isbns of the books currently out with this member, mirrors the active transactions
    pub borrowed_books: Vec<Isbn>,
    pub join_date: DateTime<Utc>,
    pub borrow_limit: usize,
}

impl Member {
    pub fn new(
        id: MemberId,
        name: String,
        email: String,
        member_type: MemberType,
        join_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            member_type,
            borrowed_books: vec![],
            join_date,
            borrow_limit: member_type.borrow_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub member_id: MemberId,
    pub book_id: Isbn,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
    pub return_date: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Opens an active loan of `book_id` to `member_id`
    pub fn borrow(
        id: TransactionId,
        member_id: MemberId,
        book_id: Isbn,
        date: DateTime<Utc>,
        loan_period: Duration,
    ) -> Self {
        Self {
            id,
            member_id,
            book_id,
            kind: TransactionKind::Borrow,
            date,
            due_date: Some(date + loan_period),
            status: TransactionStatus::Active,
            return_date: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due_date) => self.is_active() && now > due_date,
            None => false,
        }
    }

    pub fn loan_state(&self, now: DateTime<Utc>) -> LoanState {
        if !self.is_active() {
            LoanState::Completed
        } else if self.is_overdue(now) {
            LoanState::Overdue
        } else {
            LoanState::Active
        }
    }
}

/// Transaction joined with its member and book at read time
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHistoryRecord {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub member_name: String,
    pub member_type: String,
    pub book_title: String,
    pub is_overdue: bool,
    pub loan_state: LoanState,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetails {
    #[serde(flatten)]
    pub member: Member,
    pub borrowed: Vec<Book>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub total_books: usize,
    pub borrowed_books: usize,
    pub available_books: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_members: usize,
    pub total_books: usize,
    pub active_loans: usize,
    pub available_books: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStats {
    pub active_loans: usize,
    pub overdue_items: usize,
    pub completed_today: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub dashboard: DashboardStats,
    pub books: BookStats,
    pub transactions: TransactionStats,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BookFilter {
    pub query: String,
    pub category: Option<String>,
    pub status: Option<BookStatus>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TransactionFilter {
    pub query: String,
    pub state: Option<LoanState>,
    pub kind: Option<TransactionKind>,
}

/// Result of a successful mutating call together with the message for the user
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub notice: Notice,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct RegisterMemberRequest {
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub member_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct AddBookRequest {
    pub title: String,
    pub author: String,
    pub category: String,
    /// Generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub member_id: String,
    pub book_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct BookListQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct TransactionListQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}
