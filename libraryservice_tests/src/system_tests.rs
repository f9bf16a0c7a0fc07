use libraryservice_catalog::api::{
    BookListQuery, BookStatus, TransactionListQuery, TransactionRequest, TransactionStatus,
};
use libraryservice_catalog::client::LibraryServiceClient;
use libraryservice_catalog::notice::Severity;

use crate::{generate_book, generate_member, service_url};

fn transaction(member_id: &str, book_id: &str, kind: &str) -> TransactionRequest {
    TransactionRequest {
        member_id: member_id.to_string(),
        book_id: book_id.to_string(),
        kind: kind.to_string(),
    }
}

#[tokio::test]
/// Simple test for member management
/// Registers a member
/// Gets the member
/// Registers the same email again - gets rejected
/// Searches members by email
/// Deletes the member
async fn libraryservice_members_e2e_test() {
    let client = LibraryServiceClient::new(&service_url()).expect("Failed to create client");
    let mut rng = rand::thread_rng();
    let request = generate_member(&mut rng, Some("faculty"));

    let member = client
        .register_member(&request)
        .await
        .expect("Failed to register member")
        .expect("Member rejected")
        .value;
    assert_eq!(member.borrow_limit, 5);

    let details = client
        .get_member(&member.id)
        .await
        .expect("Failed to get member")
        .expect("Member not found");
    assert_eq!(details.member, member);
    assert!(details.borrowed.is_empty());

    let duplicate = client
        .register_member(&request)
        .await
        .expect("Failed to register member");
    assert!(matches!(duplicate, Err(notice) if notice.severity == Severity::Error));

    let found = client
        .search_members(&request.email)
        .await
        .expect("Failed to search members");
    assert_eq!(found, vec![member.clone()]);

    client
        .delete_member(&member.id)
        .await
        .expect("Failed to delete member")
        .expect("Delete rejected");
    assert!(client
        .get_member(&member.id)
        .await
        .expect("Failed to get member")
        .is_none());
}

#[tokio::test]
/// Simple test for the loan lifecycle
/// Registers a student and adds a book
/// Borrows the book, a second borrow gets rejected
/// Deleting the borrowed book gets rejected
/// Returns the book, checks history
/// Deletes the book
async fn libraryservice_loans_e2e_test() {
    let client = LibraryServiceClient::new(&service_url()).expect("Failed to create client");
    let mut rng = rand::thread_rng();

    let member = client
        .register_member(&generate_member(&mut rng, Some("student")))
        .await
        .expect("Failed to register member")
        .expect("Member rejected")
        .value;
    let book = client
        .add_book(&generate_book(&mut rng))
        .await
        .expect("Failed to add book")
        .expect("Book rejected")
        .value;

    let borrow = client
        .process_transaction(&transaction(&member.id, &book.isbn, "borrow"))
        .await
        .expect("Failed to borrow")
        .expect("Borrow rejected");
    assert_eq!(borrow.notice.severity, Severity::Success);
    let due_date = borrow.value.due_date.expect("Borrow without due date");
    assert_eq!((due_date - borrow.value.date).num_days(), 5);

    let second_borrow = client
        .process_transaction(&transaction(&member.id, &book.isbn, "borrow"))
        .await
        .expect("Failed to borrow");
    assert!(second_borrow.is_err());

    let delete_borrowed = client.delete_book(&book.isbn).await.expect("Failed to delete");
    assert!(delete_borrowed.is_err());

    let borrowed_books = client
        .list_books(&BookListQuery {
            query: Some(book.isbn.clone()),
            status: Some("borrowed".to_string()),
            ..BookListQuery::default()
        })
        .await
        .expect("Failed to list books");
    assert_eq!(borrowed_books.len(), 1);
    assert_eq!(borrowed_books[0].status, BookStatus::Borrowed);

    let returned = client
        .process_transaction(&transaction(&member.id, &book.isbn, "return"))
        .await
        .expect("Failed to return")
        .expect("Return rejected");
    assert_eq!(returned.value.id, borrow.value.id);
    assert_eq!(returned.value.status, TransactionStatus::Completed);

    let history = client
        .list_transactions(&TransactionListQuery {
            query: Some(member.id.clone()),
            ..TransactionListQuery::default()
        })
        .await
        .expect("Failed to list transactions");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].book_title, book.title);

    client
        .delete_book(&book.isbn)
        .await
        .expect("Failed to delete")
        .expect("Delete rejected");
    assert!(client
        .get_book(&book.isbn)
        .await
        .expect("Failed to get book")
        .is_none());
}
