use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthorId, BookId, BookValidationError, InventoryError, ReturnPolicy};

/// 書籍の書誌情報と所蔵冊数（作成・更新コマンドの入力）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub title: String,
    pub author_id: AuthorId,
    pub isbn: String,
    pub publication_year: i32,
    pub publisher: String,
    pub description: String,
    pub total_copies: i32,
}

/// Book集約 - 1タイトル分の書誌情報と在庫カウンタ
///
/// 不変条件：0 <= available_copies <= total_copies
/// 制約としてではなく、更新時（下記の純粋関数）で強制する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author_id: AuthorId,
    pub isbn: String,
    pub publication_year: i32,
    pub publisher: String,
    pub description: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 在庫の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// 0 < available_copies <= total_copies
    CopiesAvailable(i32),
    /// available_copies = 0
    Exhausted,
}

impl Book {
    pub fn availability(&self) -> Availability {
        if self.available_copies > 0 {
            Availability::CopiesAvailable(self.available_copies)
        } else {
            Availability::Exhausted
        }
    }

    /// 貸出中の冊数
    pub fn lent_copies(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

fn validate(details: &BookDetails) -> Result<(), BookValidationError> {
    if details.title.trim().is_empty() {
        return Err(BookValidationError::EmptyTitle);
    }
    if details.total_copies < 0 {
        return Err(BookValidationError::NegativeTotalCopies(details.total_copies));
    }
    Ok(())
}

/// 純粋関数：書籍を登録する
///
/// ビジネスルール：
/// - タイトルは空でない
/// - 所蔵冊数は0以上
/// - 作成時は全冊が貸出可能（available_copies = total_copies）
pub fn register_book(details: BookDetails, now: DateTime<Utc>) -> Result<Book, BookValidationError> {
    validate(&details)?;

    Ok(Book {
        id: BookId::new(),
        title: details.title,
        author_id: details.author_id,
        isbn: details.isbn,
        publication_year: details.publication_year,
        publisher: details.publisher,
        description: details.description,
        total_copies: details.total_copies,
        available_copies: details.total_copies,
        created_at: now,
        updated_at: now,
    })
}

/// 純粋関数：書誌情報と所蔵冊数を更新する
///
/// 貸出中の冊数は変えずに、所蔵冊数の増減分だけavailable_copiesを調整する。
/// 貸出中の冊数を下回る所蔵冊数への変更は拒否する。
pub fn revise_book(
    book: &Book,
    details: BookDetails,
    now: DateTime<Utc>,
) -> Result<Book, BookValidationError> {
    validate(&details)?;

    let lent = book.lent_copies();
    if details.total_copies < lent {
        return Err(BookValidationError::TotalBelowLentCopies {
            lent,
            requested: details.total_copies,
        });
    }

    Ok(Book {
        id: book.id,
        title: details.title,
        author_id: details.author_id,
        isbn: details.isbn,
        publication_year: details.publication_year,
        publisher: details.publisher,
        description: details.description,
        total_copies: details.total_copies,
        available_copies: details.total_copies - lent,
        created_at: book.created_at,
        updated_at: now,
    })
}

/// 純粋関数：1冊貸し出す
///
/// available_copies > 0 の場合のみ1減らす。
/// ストア側の条件付き更新（available_copies > 0 を条件とするUPDATE）と同じ判定。
pub fn take_copy(book: &Book, now: DateTime<Utc>) -> Result<Book, InventoryError> {
    match book.availability() {
        Availability::Exhausted => Err(InventoryError::NoAvailableCopies),
        Availability::CopiesAvailable(n) => Ok(Book {
            available_copies: n - 1,
            updated_at: now,
            ..book.clone()
        }),
    }
}

/// 純粋関数：1冊返却する
///
/// `ReturnPolicy::CappedAtTotal` の場合、全冊が棚にあれば拒否する。
/// `ReturnPolicy::Unchecked` の場合は無条件に1増やす。
pub fn put_back_copy(
    book: &Book,
    policy: ReturnPolicy,
    now: DateTime<Utc>,
) -> Result<Book, InventoryError> {
    if policy == ReturnPolicy::CappedAtTotal && book.available_copies >= book.total_copies {
        return Err(InventoryError::NoOutstandingLoans);
    }

    Ok(Book {
        available_copies: book.available_copies + 1,
        updated_at: now,
        ..book.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(total_copies: i32) -> BookDetails {
        BookDetails {
            title: "The Rust Programming Language".to_string(),
            author_id: AuthorId::new(),
            isbn: "978-1718503106".to_string(),
            publication_year: 2023,
            publisher: "No Starch Press".to_string(),
            description: "".to_string(),
            total_copies,
        }
    }

    // TDD: register_book() のテスト
    #[test]
    fn test_register_book_starts_with_all_copies_available() {
        let now = Utc::now();
        let book = register_book(details(3), now).unwrap();

        assert_eq!(book.total_copies, 3);
        assert_eq!(book.available_copies, 3);
        assert_eq!(book.created_at, now);
        assert_eq!(book.updated_at, now);
        assert_eq!(book.availability(), Availability::CopiesAvailable(3));
    }

    #[test]
    fn test_register_book_with_zero_copies_is_exhausted() {
        let book = register_book(details(0), Utc::now()).unwrap();
        assert_eq!(book.availability(), Availability::Exhausted);
    }

    #[test]
    fn test_register_book_rejects_empty_title() {
        let mut d = details(1);
        d.title = "   ".to_string();
        assert_eq!(
            register_book(d, Utc::now()),
            Err(BookValidationError::EmptyTitle)
        );
    }

    #[test]
    fn test_register_book_rejects_negative_copies() {
        assert_eq!(
            register_book(details(-1), Utc::now()),
            Err(BookValidationError::NegativeTotalCopies(-1))
        );
    }

    // TDD: take_copy() のテスト
    #[test]
    fn test_take_copy_decrements_by_one() {
        let book = register_book(details(2), Utc::now()).unwrap();
        let after = take_copy(&book, Utc::now()).unwrap();
        assert_eq!(after.available_copies, 1);
        assert_eq!(after.total_copies, 2);
    }

    #[test]
    fn test_take_copy_fails_when_exhausted() {
        let book = register_book(details(1), Utc::now()).unwrap();
        let after = take_copy(&book, Utc::now()).unwrap();
        assert_eq!(after.availability(), Availability::Exhausted);

        let result = take_copy(&after, Utc::now());
        assert_eq!(result, Err(InventoryError::NoAvailableCopies));
    }

    // TDD: put_back_copy() のテスト
    #[test]
    fn test_put_back_copy_increments_by_one() {
        let book = register_book(details(2), Utc::now()).unwrap();
        let lent = take_copy(&book, Utc::now()).unwrap();

        let returned = put_back_copy(&lent, ReturnPolicy::CappedAtTotal, Utc::now()).unwrap();
        assert_eq!(returned.available_copies, 2);
    }

    #[test]
    fn test_put_back_copy_capped_rejects_when_all_on_shelf() {
        let book = register_book(details(2), Utc::now()).unwrap();
        let result = put_back_copy(&book, ReturnPolicy::CappedAtTotal, Utc::now());
        assert_eq!(result, Err(InventoryError::NoOutstandingLoans));
    }

    #[test]
    fn test_put_back_copy_unchecked_exceeds_total() {
        // 上限なしポリシーでは available_copies が total_copies を超え得る
        let book = register_book(details(2), Utc::now()).unwrap();
        let returned = put_back_copy(&book, ReturnPolicy::Unchecked, Utc::now()).unwrap();
        assert_eq!(returned.available_copies, 3);
    }

    // TDD: revise_book() のテスト
    #[test]
    fn test_revise_book_keeps_lent_count() {
        let book = register_book(details(3), Utc::now()).unwrap();
        let lent = take_copy(&book, Utc::now()).unwrap();

        let revised = revise_book(&lent, details(5), Utc::now()).unwrap();
        assert_eq!(revised.id, book.id);
        assert_eq!(revised.created_at, book.created_at);
        assert_eq!(revised.total_copies, 5);
        assert_eq!(revised.available_copies, 4);
        assert_eq!(revised.lent_copies(), 1);
    }

    #[test]
    fn test_revise_book_rejects_total_below_lent() {
        let book = register_book(details(2), Utc::now()).unwrap();
        let lent = take_copy(&take_copy(&book, Utc::now()).unwrap(), Utc::now()).unwrap();

        let result = revise_book(&lent, details(1), Utc::now());
        assert_eq!(
            result,
            Err(BookValidationError::TotalBelowLentCopies {
                lent: 2,
                requested: 1
            })
        );
    }
}
