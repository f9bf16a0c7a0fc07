use itertools::Itertools;

use crate::api::{
    Book, BookFilter, BookStats, BookStatus, CatalogStats, DashboardStats, Member, MemberDetails,
    Transaction, TransactionFilter, TransactionHistoryRecord, TransactionStats,
};
use crate::catalog_service::{CatalogError, LibraryCatalogService};

const ACTIVE_MEMBERS_SHOWN: usize = 5;

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

fn contains(field: &str, query: &str) -> bool {
    field.to_lowercase().contains(query)
}

impl LibraryCatalogService {
    pub fn members(&self) -> &[Member] {
        &self.collections.members
    }

    pub fn books(&self) -> &[Book] {
        &self.collections.books
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.collections.transactions
    }

    pub fn get_member(&self, member_id: &str) -> Result<Member, CatalogError> {
        let member_id = member_id.trim();
        self.collections
            .members
            .iter()
            .find(|m| m.id == member_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound("Member not found".to_string()))
    }

    pub fn get_book(&self, isbn: &str) -> Result<Book, CatalogError> {
        let isbn = isbn.trim();
        self.collections
            .books
            .iter()
            .find(|b| b.isbn == isbn)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound("Book not found".to_string()))
    }

    /// Member together with the records of the books currently out with them
    pub fn member_details(&self, member_id: &str) -> Result<MemberDetails, CatalogError> {
        let member = self.get_member(member_id)?;
        let borrowed = member
            .borrowed_books
            .iter()
            .filter_map(|isbn| self.collections.books.iter().find(|b| &b.isbn == isbn))
            .cloned()
            .collect();
        Ok(MemberDetails { member, borrowed })
    }

    /// Case-insensitive match on id, name or email, in registration order
    pub fn search_members(&self, query: &str) -> Vec<Member> {
        let query = normalize(query);
        self.collections
            .members
            .iter()
            .filter(|m| contains(&m.id, &query) || contains(&m.name, &query) || contains(&m.email, &query))
            .cloned()
            .collect()
    }

    /// Case-insensitive match on isbn, title, author or category, in insertion order
    pub fn search_books(&self, query: &str) -> Vec<Book> {
        let query = normalize(query);
        self.collections
            .books
            .iter()
            .filter(|b| book_matches(b, &query))
            .cloned()
            .collect()
    }

    pub fn list_books(&self, filter: &BookFilter) -> Vec<Book> {
        let query = normalize(&filter.query);
        let category = filter
            .category
            .as_deref()
            .map(normalize)
            .filter(|category| !category.is_empty());

        self.collections
            .books
            .iter()
            .filter(|b| book_matches(b, &query))
            .filter(|b| match &category {
                Some(category) => &b.category.to_lowercase() == category,
                None => true,
            })
            .filter(|b| filter.status.map_or(true, |status| b.status == status))
            .cloned()
            .collect()
    }

    pub fn find_active_transaction(&self, member_id: &str, book_id: &str) -> Option<Transaction> {
        self.collections
            .transactions
            .iter()
            .find(|t| t.member_id == member_id && t.book_id == book_id && t.is_active())
            .cloned()
    }

    /// Joins each transaction with its member and book. Dangling references get placeholder labels.
    pub fn get_transaction_history(&self, query: &str) -> Vec<TransactionHistoryRecord> {
        let query = normalize(query);
        let now = self.clock.now();

        self.collections
            .transactions
            .iter()
            .filter_map(|transaction| {
                let member = self
                    .collections
                    .members
                    .iter()
                    .find(|m| m.id == transaction.member_id);
                let book = self
                    .collections
                    .books
                    .iter()
                    .find(|b| b.isbn == transaction.book_id);

                let matches = query.is_empty()
                    || member.is_some_and(|m| contains(&m.name, &query) || contains(&m.id, &query))
                    || book.is_some_and(|b| contains(&b.title, &query) || contains(&b.isbn, &query))
                    || contains(&transaction.id, &query)
                    || contains(transaction.kind.as_str(), &query);
                if !matches {
                    return None;
                }

                Some(TransactionHistoryRecord {
                    member_name: member.map_or_else(|| "Unknown Member".to_string(), |m| m.name.clone()),
                    member_type: member.map_or_else(|| "Unknown".to_string(), |m| m.member_type.to_string()),
                    book_title: book.map_or_else(|| "Unknown Book".to_string(), |b| b.title.clone()),
                    is_overdue: transaction.is_overdue(now),
                    loan_state: transaction.loan_state(now),
                    transaction: transaction.clone(),
                })
            })
            .collect()
    }

    /// History narrowed by loan state and kind, most recent first
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Vec<TransactionHistoryRecord> {
        self.get_transaction_history(&filter.query)
            .into_iter()
            .filter(|record| filter.state.map_or(true, |state| record.loan_state == state))
            .filter(|record| filter.kind.map_or(true, |kind| record.transaction.kind == kind))
            .sorted_by(|a, b| b.transaction.date.cmp(&a.transaction.date))
            .collect()
    }

    pub fn book_stats(&self) -> BookStats {
        let borrowed_books = self
            .collections
            .books
            .iter()
            .filter(|b| b.status == BookStatus::Borrowed)
            .count();
        BookStats {
            total_books: self.collections.books.len(),
            borrowed_books,
            available_books: self.collections.books.len() - borrowed_books,
        }
    }

    pub fn dashboard_stats(&self) -> DashboardStats {
        let book_stats = self.book_stats();
        DashboardStats {
            total_members: self.collections.members.len(),
            total_books: book_stats.total_books,
            active_loans: self.active_loans(),
            available_books: book_stats.available_books,
        }
    }

    pub fn transaction_stats(&self) -> TransactionStats {
        let now = self.clock.now();
        let today = now.date_naive();
        TransactionStats {
            active_loans: self.active_loans(),
            overdue_items: self
                .collections
                .transactions
                .iter()
                .filter(|t| t.is_overdue(now))
                .count(),
            completed_today: self
                .collections
                .transactions
                .iter()
                .filter(|t| !t.is_active())
                .filter(|t| t.return_date.is_some_and(|date| date.date_naive() == today))
                .count(),
        }
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            dashboard: self.dashboard_stats(),
            books: self.book_stats(),
            transactions: self.transaction_stats(),
        }
    }

    /// First few members, in registration order, holding at least one book
    pub fn active_members(&self) -> Vec<Member> {
        self.collections
            .members
            .iter()
            .filter(|m| !m.borrowed_books.is_empty())
            .take(ACTIVE_MEMBERS_SHOWN)
            .cloned()
            .collect()
    }

    fn active_loans(&self) -> usize {
        self.collections
            .transactions
            .iter()
            .filter(|t| t.is_active())
            .count()
    }
}

fn book_matches(book: &Book, query: &str) -> bool {
    contains(&book.isbn, query)
        || contains(&book.title, query)
        || contains(&book.author, query)
        || contains(&book.category, query)
}

#[cfg(test)]
mod tests_catalog_queries {
    use std::sync::Arc;

    use chrono::Duration;

    use crate::api::{LoanState, TransactionKind};
    use crate::catalog_service::tests_catalog_service::{
        assert_loans_consistent, service_with_clock, start_time,
    };
    use crate::catalog_store::{save_records, Bucket, InMemoryCatalogStore};
    use crate::clock::ManualClock;

    use super::*;

    #[test]
    fn test_search_is_case_insensitive_and_keeps_order() {
        let (mut service, _clock) = service_with_clock();
        service.register_member("Alice Smith", "alice@x.com", "student").unwrap();
        service.register_member("Bob", "bob@SMITH.org", "faculty").unwrap();
        service.register_member("Carol", "carol@x.com", "staff").unwrap();

        let names: Vec<String> = service
            .search_members("  smith ")
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Alice Smith", "Bob"]);
        assert_eq!(service.search_members("").len(), 3);
        assert!(service.search_members("nobody").is_empty());

        let carol = service.search_members("carol").remove(0);
        assert_eq!(service.search_members(&carol.id.to_lowercase()), vec![carol]);

        service.add_book("Dune", "Frank Herbert", "Fiction").unwrap();
        service.add_book("Cosmos", "Carl Sagan", "Science").unwrap();
        service.add_book("Children of Dune", "Frank Herbert", "fiction").unwrap();

        let titles: Vec<String> = service
            .search_books("DUNE")
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Dune", "Children of Dune"]);
        assert_eq!(service.search_books("science").len(), 1);
        assert_eq!(service.search_books("isbn-").len(), 3);
    }

    #[test]
    fn test_list_books_by_category_and_status() {
        let (mut service, _clock) = service_with_clock();
        let alice = service
            .register_member("Alice", "a@x.com", "student")
            .unwrap()
            .value;
        let dune = service.add_book("Dune", "Herbert", "Fiction").unwrap().value;
        service.add_book("Emma", "Austen", "fiction").unwrap();
        service.add_book("Cosmos", "Sagan", "science").unwrap();
        service
            .process_transaction(&alice.id, &dune.isbn, TransactionKind::Borrow)
            .unwrap();

        let fiction = service.list_books(&BookFilter {
            category: Some("FICTION".to_string()),
            ..BookFilter::default()
        });
        assert_eq!(fiction.len(), 2);

        let available_fiction = service.list_books(&BookFilter {
            category: Some("fiction".to_string()),
            status: Some(BookStatus::Available),
            ..BookFilter::default()
        });
        assert_eq!(available_fiction.len(), 1);
        assert_eq!(available_fiction[0].title, "Emma");

        let borrowed = service.list_books(&BookFilter {
            status: Some(BookStatus::Borrowed),
            ..BookFilter::default()
        });
        assert_eq!(borrowed, vec![service.get_book(&dune.isbn).unwrap()]);

        assert_eq!(service.list_books(&BookFilter::default()).len(), 3);
    }

    #[test]
    /// History joins names, flags overdue loans, and survives deleted references
    fn test_transaction_history_and_filters() {
        let (mut service, clock) = service_with_clock();
        let alice = service
            .register_member("Alice", "a@x.com", "student")
            .unwrap()
            .value;
        let bob = service
            .register_member("Bob", "b@x.com", "faculty")
            .unwrap()
            .value;
        let dune = service.add_book("Dune", "Herbert", "fiction").unwrap().value;
        let emma = service.add_book("Emma", "Austen", "classic").unwrap().value;

        service
            .process_transaction(&alice.id, &dune.isbn, TransactionKind::Borrow)
            .unwrap();
        clock.advance(Duration::days(1));
        service
            .process_transaction(&bob.id, &emma.isbn, TransactionKind::Borrow)
            .unwrap();

        let history = service.get_transaction_history("");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].member_name, "Alice");
        assert_eq!(history[0].member_type, "student");
        assert_eq!(history[0].book_title, "Dune");
        assert!(!history[0].is_overdue);

        assert_eq!(service.get_transaction_history("emma").len(), 1);
        assert_eq!(service.get_transaction_history(&alice.id).len(), 1);
        assert_eq!(service.get_transaction_history("BORROW").len(), 2);
        assert!(service.get_transaction_history("return").is_empty());

        // Alice's loan is due after 5 days, Bob's after 7 days from the next day
        clock.set(start_time() + Duration::days(6));
        let overdue = service.list_transactions(&TransactionFilter {
            state: Some(LoanState::Overdue),
            ..TransactionFilter::default()
        });
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].transaction.member_id, alice.id);
        assert!(overdue[0].is_overdue);

        service
            .process_transaction(&bob.id, &emma.isbn, TransactionKind::Return)
            .unwrap();
        service.delete_book(&emma.isbn).unwrap();
        service.delete_member(&bob.id).unwrap();

        let all = service.list_transactions(&TransactionFilter::default());
        assert_eq!(all.len(), 2);
        // most recent first
        assert_eq!(all[0].member_name, "Unknown Member");
        assert_eq!(all[0].member_type, "Unknown");
        assert_eq!(all[0].book_title, "Unknown Book");
        assert_eq!(all[0].loan_state, LoanState::Completed);
        assert!(!all[0].is_overdue);
        assert_eq!(all[1].book_title, "Dune");

        let completed = service.list_transactions(&TransactionFilter {
            state: Some(LoanState::Completed),
            kind: Some(TransactionKind::Borrow),
            ..TransactionFilter::default()
        });
        assert_eq!(completed.len(), 1);
    }

    #[test]
    fn test_stats_and_active_members() {
        let (mut service, clock) = service_with_clock();
        let alice = service
            .register_member("Alice", "a@x.com", "student")
            .unwrap()
            .value;
        service.register_member("Bob", "b@x.com", "faculty").unwrap();
        let dune = service.add_book("Dune", "Herbert", "fiction").unwrap().value;
        let emma = service.add_book("Emma", "Austen", "classic").unwrap().value;
        service.add_book("Cosmos", "Sagan", "science").unwrap();

        service
            .process_transaction(&alice.id, &dune.isbn, TransactionKind::Borrow)
            .unwrap();
        service
            .process_transaction(&alice.id, &emma.isbn, TransactionKind::Borrow)
            .unwrap();
        assert_eq!(service.active_members(), vec![service.get_member(&alice.id).unwrap()]);

        clock.advance(Duration::days(6));
        service
            .process_transaction(&alice.id, &emma.isbn, TransactionKind::Return)
            .unwrap();

        let stats = service.stats();
        assert_eq!(
            stats.books,
            BookStats {
                total_books: 3,
                borrowed_books: 1,
                available_books: 2,
            }
        );
        assert_eq!(
            stats.dashboard,
            DashboardStats {
                total_members: 2,
                total_books: 3,
                active_loans: 1,
                available_books: 2,
            }
        );
        assert_eq!(
            stats.transactions,
            TransactionStats {
                active_loans: 1,
                overdue_items: 1,
                completed_today: 1,
            }
        );

        clock.advance(Duration::days(1));
        assert_eq!(service.transaction_stats().completed_today, 0);
    }

    #[test]
    fn test_member_details_lists_borrowed_books() {
        let (mut service, _clock) = service_with_clock();
        let alice = service
            .register_member("Alice", "a@x.com", "student")
            .unwrap()
            .value;
        let dune = service.add_book("Dune", "Herbert", "fiction").unwrap().value;
        service
            .process_transaction(&alice.id, &dune.isbn, TransactionKind::Borrow)
            .unwrap();

        let details = service.member_details(&alice.id).unwrap();
        assert_eq!(details.member.borrowed_books, vec![dune.isbn.clone()]);
        assert_eq!(details.borrowed, vec![service.get_book(&dune.isbn).unwrap()]);

        assert!(matches!(
            service.member_details("MEM0000000"),
            Err(CatalogError::NotFound(..))
        ));
        assert!(service.find_active_transaction(&alice.id, &dune.isbn).is_some());
    }

    #[test]
    fn test_corrupt_bucket_is_treated_as_empty() {
        let store = Arc::new(InMemoryCatalogStore::default());
        let clock = Arc::new(ManualClock::new(start_time()));
        {
            let mut service = LibraryCatalogService::open(store.clone(), clock.clone());
            service.add_book("Dune", "Herbert", "fiction").unwrap();
            service.register_member("Alice", "a@x.com", "student").unwrap();
        }
        save_records::<String>(store.as_ref(), Bucket::Members, &["garbage".to_string()]).unwrap();

        let service = LibraryCatalogService::open(store, clock);
        assert!(service.members().is_empty());
        assert_eq!(service.books().len(), 1);
        assert_loans_consistent(&service);
    }
}
