use std::sync::Arc;

use chrono::Duration;

use crate::api::{
    Book, BookStatus, Isbn, Member, MemberId, MemberType, Outcome, Transaction, TransactionKind,
    TransactionStatus,
};
use crate::catalog_store::{
    load_records, save_records, Bucket, CatalogStore, CatalogStoreError,
};
use crate::clock::{Clock, SystemClock};
use crate::identifiers::{
    generate_isbn, generate_member_id, generate_transaction_id, unique_identifier,
};
use crate::notice::Notice;

mod queries;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Borrowing limit ({limit}) reached for {member_type}")]
    LimitExceeded {
        limit: usize,
        member_type: MemberType,
    },

    #[error("Book {0} is not available for borrowing")]
    Unavailable(Isbn),

    #[error("No active borrow record found for member {member_id} and book {book_id}")]
    NoActiveRecord { member_id: MemberId, book_id: Isbn },

    #[error("{0}")]
    Conflict(String),

    #[error("Failed to persist catalog: {0}")]
    Storage(#[from] CatalogStoreError),
}

#[derive(Debug, Clone, Default)]
struct Collections {
    members: Vec<Member>,
    books: Vec<Book>,
    transactions: Vec<Transaction>,
}

/// Owns the members, books and transactions of one library.
///
/// Every mutating call either applies fully and flushes the touched buckets,
/// or leaves the in-memory state exactly as it was.
pub struct LibraryCatalogService {
    store: Arc<dyn CatalogStore>,
    clock: Arc<dyn Clock>,
    collections: Collections,
}

impl LibraryCatalogService {
    /// Loads all buckets from the store
    pub fn open(store: Arc<dyn CatalogStore>, clock: Arc<dyn Clock>) -> Self {
        let collections = Collections {
            members: load_records(store.as_ref(), Bucket::Members),
            books: load_records(store.as_ref(), Bucket::Books),
            transactions: load_records(store.as_ref(), Bucket::Transactions),
        };
        tracing::info!(
            "Catalog loaded: {} members, {} books, {} transactions",
            collections.members.len(),
            collections.books.len(),
            collections.transactions.len()
        );
        Self {
            store,
            clock,
            collections,
        }
    }

    pub fn with_system_clock(store: Arc<dyn CatalogStore>) -> Self {
        Self::open(store, Arc::new(SystemClock))
    }

    pub fn register_member(
        &mut self,
        name: &str,
        email: &str,
        member_type: &str,
    ) -> Result<Outcome<Member>, CatalogError> {
        let now = self.clock.now();
        let (name, email, member_type) = (name.trim(), email.trim(), member_type.trim());

        self.commit("register_member", &[Bucket::Members], |collections| {
            if name.is_empty() || email.is_empty() || member_type.is_empty() {
                return Err(CatalogError::Validation(
                    "All fields are required".to_string(),
                ));
            }
            let member_type = MemberType::parse(member_type).ok_or_else(|| {
                CatalogError::Validation(format!("Unknown member type {member_type}"))
            })?;
            if collections.members.iter().any(|m| m.email == email) {
                return Err(CatalogError::Duplicate(
                    "Email already registered".to_string(),
                ));
            }

            let id = unique_identifier(
                now,
                |candidate| collections.members.iter().any(|m| m.id == candidate),
                |instant, rng| generate_member_id(instant, rng),
            )
            .ok_or_else(|| CatalogError::Conflict("No free member ID left".to_string()))?;

            let member = Member::new(
                id,
                name.to_string(),
                email.to_string(),
                member_type,
                now,
            );
            collections.members.push(member.clone());

            let notice = Notice::success(format!(
                "Member registered successfully! ID: {}",
                member.id
            ));
            Ok(Outcome {
                value: member,
                notice,
            })
        })
    }

    pub fn add_book(
        &mut self,
        title: &str,
        author: &str,
        category: &str,
    ) -> Result<Outcome<Book>, CatalogError> {
        self.insert_book(title, author, category, None)
    }

    /// Adds a book under a caller chosen isbn, which must not be taken yet
    pub fn add_book_with_isbn(
        &mut self,
        title: &str,
        author: &str,
        category: &str,
        isbn: &str,
    ) -> Result<Outcome<Book>, CatalogError> {
        self.insert_book(title, author, category, Some(isbn))
    }

    fn insert_book(
        &mut self,
        title: &str,
        author: &str,
        category: &str,
        isbn: Option<&str>,
    ) -> Result<Outcome<Book>, CatalogError> {
        let now = self.clock.now();
        let (title, author, category) = (title.trim(), author.trim(), category.trim());
        let isbn = isbn.map(str::trim).filter(|isbn| !isbn.is_empty());

        self.commit("add_book", &[Bucket::Books], |collections| {
            if title.is_empty() || author.is_empty() || category.is_empty() {
                return Err(CatalogError::Validation(
                    "Title, author, and category are required".to_string(),
                ));
            }

            let isbn = match isbn {
                Some(isbn) if collections.books.iter().any(|b| b.isbn == isbn) => {
                    return Err(CatalogError::Duplicate(format!(
                        "Book with ISBN {isbn} already exists"
                    )));
                }
                Some(isbn) => isbn.to_string(),
                None => unique_identifier(
                    now,
                    |candidate| collections.books.iter().any(|b| b.isbn == candidate),
                    |instant, rng| generate_isbn(instant, rng),
                )
                .ok_or_else(|| CatalogError::Conflict("No free ISBN left".to_string()))?,
            };

            let book = Book::new(
                isbn,
                title.to_string(),
                author.to_string(),
                category.to_string(),
                now,
            );
            collections.books.push(book.clone());

            let notice = Notice::success(format!("Book added successfully! ISBN: {}", book.isbn));
            Ok(Outcome {
                value: book,
                notice,
            })
        })
    }

    /// The only entry point that flips book status, member loans and transaction status
    pub fn process_transaction(
        &mut self,
        member_id: &str,
        book_id: &str,
        kind: TransactionKind,
    ) -> Result<Outcome<Transaction>, CatalogError> {
        let now = self.clock.now();
        let (member_id, book_id) = (member_id.trim(), book_id.trim());

        self.commit(
            "process_transaction",
            &Bucket::ALL,
            |collections| {
                let Collections {
                    members,
                    books,
                    transactions,
                } = collections;
                let member = members.iter_mut().find(|m| m.id == member_id);
                let book = books.iter_mut().find(|b| b.isbn == book_id);
                let (Some(member), Some(book)) = (member, book) else {
                    return Err(CatalogError::NotFound(
                        "Invalid Member ID or Book ISBN".to_string(),
                    ));
                };

                match kind {
                    TransactionKind::Borrow => {
                        let limit = member.member_type.borrow_limit();
                        if member.borrowed_books.len() >= limit {
                            return Err(CatalogError::LimitExceeded {
                                limit,
                                member_type: member.member_type,
                            });
                        }
                        if book.status != BookStatus::Available {
                            return Err(CatalogError::Unavailable(book.isbn.clone()));
                        }

                        let loan_days = member.member_type.loan_period_days();
                        let transaction = Transaction::borrow(
                            generate_transaction_id(),
                            member.id.clone(),
                            book.isbn.clone(),
                            now,
                            Duration::days(loan_days),
                        );
                        transactions.push(transaction.clone());
                        book.status = BookStatus::Borrowed;
                        member.borrowed_books.push(book.isbn.clone());

                        let due_date = transaction.due_date.unwrap_or(now);
                        let notice = Notice::success(format!(
                            "Book borrowed successfully by {}. Due Date: {}. Loan Period: {} days",
                            member.name,
                            due_date.format("%Y-%m-%d"),
                            loan_days
                        ));
                        Ok(Outcome {
                            value: transaction,
                            notice,
                        })
                    }
                    TransactionKind::Return => {
                        let transaction = transactions
                            .iter_mut()
                            .find(|t| {
                                t.member_id == member.id && t.book_id == book.isbn && t.is_active()
                            })
                            .ok_or_else(|| CatalogError::NoActiveRecord {
                                member_id: member.id.clone(),
                                book_id: book.isbn.clone(),
                            })?;

                        transaction.status = TransactionStatus::Completed;
                        transaction.return_date = Some(now);
                        book.status = BookStatus::Available;
                        member.borrowed_books.retain(|isbn| isbn != &book.isbn);

                        let notice = match transaction.due_date {
                            Some(due_date) if now > due_date => Notice::warning(format!(
                                "Book returned late by {}. Due date was {}",
                                member.name,
                                due_date.format("%Y-%m-%d")
                            )),
                            _ => Notice::success(format!(
                                "Book returned successfully by {}",
                                member.name
                            )),
                        };
                        Ok(Outcome {
                            value: transaction.clone(),
                            notice,
                        })
                    }
                }
            },
        )
    }

    /// Removes a member that has no active loans
    pub fn delete_member(&mut self, member_id: &str) -> Result<Outcome<Member>, CatalogError> {
        let member_id = member_id.trim();

        self.commit("delete_member", &[Bucket::Members], |collections| {
            if member_id.is_empty() {
                return Err(CatalogError::Validation("Invalid member ID".to_string()));
            }
            let position = collections
                .members
                .iter()
                .position(|m| m.id == member_id)
                .ok_or_else(|| CatalogError::NotFound("Member not found".to_string()))?;
            if collections
                .transactions
                .iter()
                .any(|t| t.member_id == member_id && t.is_active())
            {
                return Err(CatalogError::Conflict(
                    "Cannot delete member with active loans".to_string(),
                ));
            }

            Ok(Outcome {
                value: collections.members.remove(position),
                notice: Notice::success("Member deleted successfully"),
            })
        })
    }

    /// Removes a book that is not currently borrowed
    pub fn delete_book(&mut self, isbn: &str) -> Result<Outcome<Book>, CatalogError> {
        let isbn = isbn.trim();

        self.commit("delete_book", &[Bucket::Books], |collections| {
            if isbn.is_empty() {
                return Err(CatalogError::Validation("Invalid book ISBN".to_string()));
            }
            let position = collections
                .books
                .iter()
                .position(|b| b.isbn == isbn)
                .ok_or_else(|| CatalogError::NotFound("Book not found".to_string()))?;
            if collections.books[position].status == BookStatus::Borrowed {
                return Err(CatalogError::Conflict(
                    "Cannot delete book that is currently borrowed".to_string(),
                ));
            }

            Ok(Outcome {
                value: collections.books.remove(position),
                notice: Notice::success("Book deleted successfully"),
            })
        })
    }

    /// Runs `change` against the collections and flushes `touched` buckets.
    /// Restores the previous state when either step fails.
    fn commit<T>(
        &mut self,
        operation: &str,
        touched: &[Bucket],
        change: impl FnOnce(&mut Collections) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let snapshot = self.collections.clone();

        let result = change(&mut self.collections).and_then(|value| {
            self.flush(touched)?;
            Ok(value)
        });

        match &result {
            Ok(_) => tracing::info!("{} succeeded", operation),
            Err(CatalogError::Storage(err)) => {
                tracing::error!("{} failed to persist: {}", operation, err);
                self.collections = snapshot;
                // Buckets written before the failure still hold the change
                for bucket in touched {
                    if let Err(err) = self.flush_bucket(*bucket) {
                        tracing::error!("Failed to restore bucket {}: {}", bucket, err);
                    }
                }
            }
            Err(err) => {
                tracing::warn!("{} rejected: {}", operation, err);
                self.collections = snapshot;
            }
        }
        result
    }

    fn flush(&self, touched: &[Bucket]) -> Result<(), CatalogStoreError> {
        touched
            .iter()
            .try_for_each(|bucket| self.flush_bucket(*bucket))
    }

    fn flush_bucket(&self, bucket: Bucket) -> Result<(), CatalogStoreError> {
        let store = self.store.as_ref();
        match bucket {
            Bucket::Members => save_records(store, bucket, &self.collections.members),
            Bucket::Books => save_records(store, bucket, &self.collections.books),
            Bucket::Transactions => save_records(store, bucket, &self.collections.transactions),
        }
    }
}
