use serde::Serialize;

/// 一覧ビューのページネーション情報
///
/// リクエストごとに計算される一時的な値で、永続化はしない。
/// current_queryは元のクエリ文字列をそのまま保持し、
/// リンク生成側がpageパラメータを付け替えられるようにする。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationInformation {
    pub current_page: u32,
    pub total_pages: u32,
    pub offset: i64,
    pub current_query: Option<String>,
}

/// ページ番号からクエリのオフセットを計算する
///
/// 総件数が分かる前（フェッチと同時にカウントを発行する場面）でも
/// 使えるように、ページネーション計算のうちこの部分だけを切り出している。
pub fn offset_for(current_page: u32, page_size: u32) -> i64 {
    (current_page.saturating_sub(1) as i64) * page_size as i64
}

/// ページネーション情報を計算する
///
/// total_pagesはceil(total_items / page_size)。total_itemsが0のとき
/// total_pagesも0になる。範囲外のページ番号はここでは丸めない
/// （リポジトリが空の結果を返すだけ）。
pub fn paginate(
    current_page: u32,
    total_items: i64,
    page_size: u32,
    current_query: Option<&str>,
) -> PaginationInformation {
    let total_pages = if total_items <= 0 {
        0
    } else {
        ((total_items + page_size as i64 - 1) / page_size as i64) as u32
    };

    PaginationInformation {
        current_page,
        total_pages,
        offset: offset_for(current_page, page_size),
        current_query: current_query.map(|q| q.to_string()),
    }
}
