use chrono::NaiveDate;
use std::time::Duration;
use tracing::{info, warn};

use crate::database::SqliteStore;
use crate::error::{LottoError, Result};
use crate::types::{Draw, LottoNumberResponse};

pub const DEFAULT_API_URL: &str = "https://www.dhlottery.co.kr/common.do?method=getLottoNumber&drwNo=";

/// Client for the results endpoint. Every request gives up after `timeout`.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Fetches one draw. `Ok(None)` means the draw has not been published yet.
pub async fn fetch_draw(
    client: &reqwest::Client,
    base_url: &str,
    draw_no: u32,
) -> Result<Option<Draw>> {
    let response: LottoNumberResponse = client
        .get(format!("{}{}", base_url, draw_no))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    parse_draw_response(draw_no, response)
}

pub fn parse_draw_response(requested: u32, response: LottoNumberResponse) -> Result<Option<Draw>> {
    if response.return_value != "success" {
        return Ok(None);
    }

    let missing = |field: &str| LottoError::InvalidDraw {
        draw_no: requested,
        reason: format!("response is missing {}", field),
    };

    let draw_no = response.draw_no.ok_or_else(|| missing("drwNo"))?;
    if draw_no != requested {
        return Err(LottoError::InvalidDraw {
            draw_no: requested,
            reason: format!("response carries draw {}", draw_no),
        });
    }
    let raw_date = response.draw_date.ok_or_else(|| missing("drwNoDate"))?;
    let draw_date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|e| {
        LottoError::InvalidDraw {
            draw_no,
            reason: format!("bad drwNoDate {:?}: {}", raw_date, e),
        }
    })?;
    let numbers = [
        response.num1.ok_or_else(|| missing("drwtNo1"))?,
        response.num2.ok_or_else(|| missing("drwtNo2"))?,
        response.num3.ok_or_else(|| missing("drwtNo3"))?,
        response.num4.ok_or_else(|| missing("drwtNo4"))?,
        response.num5.ok_or_else(|| missing("drwtNo5"))?,
        response.num6.ok_or_else(|| missing("drwtNo6"))?,
    ];
    let bonus = response.bonus.ok_or_else(|| missing("bnusNo"))?;

    Draw::new(draw_no, draw_date, numbers, bonus).map(Some)
}

/// Walks forward from the newest stored draw until the endpoint has nothing more,
/// storing each result. Returns the draws that were added.
pub async fn ingest_new_draws(
    store: &SqliteStore,
    client: &reqwest::Client,
    base_url: &str,
    pause: Duration,
) -> Result<Vec<Draw>> {
    let mut next = store.latest_draw_no()? + 1;
    let mut added = Vec::new();

    info!("Checking for draws from {}", next);

    loop {
        let Some(draw) = fetch_draw(client, base_url, next).await? else {
            break;
        };
        if store.insert_draw(&draw)? {
            info!("Saved draw {} ({})", draw.draw_no, draw.draw_date);
            added.push(draw);
        } else {
            warn!("Draw {} was already stored", draw.draw_no);
        }
        next += 1;
        tokio::time::sleep(pause).await;
    }

    if added.is_empty() {
        info!("Draw history is already up to date");
    } else {
        info!("Stored {} new draws", added.len());
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    fn response(raw: &str) -> LottoNumberResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_parse_success() {
        let raw = r#"{"totSellamnt":111840714000,"returnValue":"success","drwNoDate":"2024-01-06",
            "firstWinamnt":1396028231,"drwtNo6":45,"drwtNo4":30,"firstPrzwnerCo":20,
            "drwtNo5":41,"bnusNo":7,"firstAccumamnt":27920564620,"drwNo":1101,
            "drwtNo2":11,"drwtNo3":22,"drwtNo1":3}"#;
        let draw = parse_draw_response(1101, response(raw)).unwrap().unwrap();
        assert_eq!(draw.draw_no, 1101);
        assert_eq!(draw.numbers, [3, 11, 22, 30, 41, 45]);
        assert_eq!(draw.bonus, 7);
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
    }

    #[test]
    fn test_parse_unpublished() {
        let draw = parse_draw_response(9999, response(r#"{"returnValue":"fail"}"#)).unwrap();
        assert!(draw.is_none());
    }

    #[test]
    fn test_parse_malformed_numbers() {
        let raw = r#"{"returnValue":"success","drwNoDate":"2024-01-06","drwNo":5,
            "drwtNo1":3,"drwtNo2":3,"drwtNo3":22,"drwtNo4":30,"drwtNo5":41,"drwtNo6":45,"bnusNo":7}"#;
        assert!(matches!(
            parse_draw_response(5, response(raw)),
            Err(LottoError::InvalidDraw { draw_no: 5, .. })
        ));
    }

    #[test]
    fn test_parse_missing_field() {
        let raw = r#"{"returnValue":"success","drwNo":5}"#;
        assert!(parse_draw_response(5, response(raw)).is_err());
    }

    #[tokio::test]
    async fn test_stalled_upstream_times_out() {
        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let store = SqliteStore::open_in_memory().unwrap();
        let client = build_client(Duration::from_millis(200)).unwrap();
        let base_url = format!("http://{}/common.do?method=getLottoNumber&drwNo=", addr);

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            ingest_new_draws(&store, &client, &base_url, Duration::ZERO),
        )
        .await;
        assert!(matches!(outcome, Ok(Err(LottoError::Http(_)))));
        assert_eq!(store.count_draws().unwrap(), 0);
    }
}
