use std::env;

use anyhow::Result;
use reqwest::Client;

const QUESTIONS: &[&str] = &[
    "/question?qID=NumStudents&className=CS144",
    "/question?qID=ProblemSetSubmissions&problemID=i4x-Medicine-HRP258-problem-1&csv=on",
    "/question?qID=bogus",
    "/invalidateCache",
];

#[tokio::main]
async fn main() -> Result<()> {
    let base = env::var("ANSWER_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let client = Client::new();

    for question in QUESTIONS {
        let response = client.get(format!("{base}{question}")).send().await?;
        let status = response.status();
        let body = response.text().await?;

        println!("{question}");
        println!("{status}: {body}\n");
    }

    Ok(())
}
