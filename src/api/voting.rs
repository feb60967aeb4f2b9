use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::AuthToken,
        pagination::{Paginated, PaginationRequest},
        receipt::VoteReceipt,
        vote::{SubmissionMeta, VoteSpec, VoteSummary},
    },
    db::{vote::AnyVote, voter::Voter},
    mongodb::{Coll, Id},
};
use crate::voting::submission::SubmissionPipeline;

pub fn routes() -> Vec<Route> {
    routes![submit_vote, vote_history]
}

/// Cast a vote in the given election. The response is the voter's receipt,
/// their proof that the vote was anchored.
#[post(
    "/voter/elections/<election_id>/votes",
    data = "<spec>",
    format = "json"
)]
async fn submit_vote(
    token: AuthToken<Voter>,
    election_id: Id,
    spec: Json<VoteSpec>,
    meta: SubmissionMeta,
    pipeline: SubmissionPipeline,
) -> Result<Json<VoteReceipt>> {
    let receipt = pipeline
        .submit_vote(token.id, election_id, &spec, meta)
        .await?;
    Ok(Json(receipt))
}

/// The authenticated voter's vote history, newest first.
#[get("/voter/votes?<pagination..>")]
async fn vote_history(
    token: AuthToken<Voter>,
    pagination: PaginationRequest,
    votes: Coll<AnyVote>,
) -> Result<Json<Paginated<VoteSummary>>> {
    let filter = doc! {"voter_id": token.id};
    let options = FindOptions::builder()
        .sort(doc! {"cast_at": -1})
        .skip(u64::from(pagination.skip()))
        .limit(i64::from(pagination.page_size))
        .build();

    let page = votes
        .find(filter.clone(), options)
        .await?
        .map_ok(VoteSummary::from)
        .try_collect::<Vec<_>>()
        .await?;
    let total = votes.count_documents(filter, None).await?;

    Ok(Json(pagination.to_paginated(total, page)))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Cookie, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::config::Config;
    use crate::model::{
        api::auth::User,
        common::vote::LedgerRef,
        db::{candidate::Candidate, election::Election, vote::Vote},
    };

    use super::*;

    async fn seed(db: &Database) -> (Voter, Election, Candidate) {
        let voter = Voter::example();
        let election = Election::example();
        let candidate = Candidate::example(election.id);
        Coll::<Voter>::from_db(db)
            .insert_one(&voter, None)
            .await
            .unwrap();
        Coll::<Election>::from_db(db)
            .insert_one(&election, None)
            .await
            .unwrap();
        Coll::<Candidate>::from_db(db)
            .insert_one(&candidate, None)
            .await
            .unwrap();
        (voter, election, candidate)
    }

    /// A session cookie signed with the server's own secret.
    fn auth_cookie<U: User>(client: &Client, user: &U) -> Cookie<'static> {
        let config = client.rocket().state::<Config>().unwrap();
        AuthToken::new(user).into_cookie(config)
    }

    fn vote_body(candidate: &Candidate) -> String {
        serde_json::to_string(&VoteSpec {
            candidate_id: candidate.id,
        })
        .unwrap()
    }

    #[backend_test]
    async fn casts_a_vote_and_refuses_a_second(client: Client, db: Database) {
        let (voter, election, candidate) = seed(&db).await;
        let cookie = auth_cookie(&client, &voter);

        let response = client
            .post(uri!(submit_vote(election.id)))
            .cookie(cookie.clone())
            .header(ContentType::JSON)
            .body(vote_body(&candidate))
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let receipt: VoteReceipt =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(receipt.election_id, election.id.into());
        assert!(!receipt.vote_hash.is_empty());
        assert!(!receipt.transaction_id.is_empty());

        // The same voter voting again in the same election is a conflict.
        let response = client
            .post(uri!(submit_vote(election.id)))
            .cookie(cookie)
            .header(ContentType::JSON)
            .body(vote_body(&candidate))
            .dispatch()
            .await;

        assert_eq!(Status::Conflict, response.status());
        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["error"], "already_voted");
    }

    #[backend_test]
    async fn reports_ineligibility_reasons(client: Client, db: Database) {
        let voter = Voter::unverified_example();
        let election = Election::example();
        let candidate = Candidate::example(election.id);
        Coll::<Voter>::from_db(&db)
            .insert_one(&voter, None)
            .await
            .unwrap();
        Coll::<Election>::from_db(&db)
            .insert_one(&election, None)
            .await
            .unwrap();
        Coll::<Candidate>::from_db(&db)
            .insert_one(&candidate, None)
            .await
            .unwrap();

        let response = client
            .post(uri!(submit_vote(election.id)))
            .cookie(auth_cookie(&client, &voter))
            .header(ContentType::JSON)
            .body(vote_body(&candidate))
            .dispatch()
            .await;

        assert_eq!(Status::Forbidden, response.status());
        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["error"], "not_eligible");
        assert_eq!(body["reasons"][0], "voter is not verified");
    }

    #[backend_test]
    async fn requires_a_session(client: Client, db: Database) {
        let (_, election, candidate) = seed(&db).await;

        let response = client
            .post(uri!(submit_vote(election.id)))
            .header(ContentType::JSON)
            .body(vote_body(&candidate))
            .dispatch()
            .await;

        // Without a token the request falls through to no matching route.
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn pages_through_the_vote_history(client: Client, db: Database) {
        let voter = Voter::example();
        Coll::<Voter>::from_db(&db)
            .insert_one(&voter, None)
            .await
            .unwrap();
        // Three confirmed votes in different elections, a minute apart.
        for minutes in 1..=3 {
            let mut vote = Vote::new(Id::new(), voter.id, Id::new(), None, None);
            vote.cast_at = Utc::now() - Duration::minutes(minutes);
            let confirmed = vote.confirm(LedgerRef {
                vote_hash: format!("hash{minutes}"),
                transaction_id: format!("txn{minutes}"),
            });
            Coll::<Vote<_>>::from_db(&db)
                .insert_one(&confirmed, None)
                .await
                .unwrap();
        }
        let cookie = auth_cookie(&client, &voter);

        let response = client
            .get("/voter/votes?page_num=1&page_size=2")
            .cookie(cookie.clone())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let page: Paginated<VoteSummary> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total, 3);
        // Newest first.
        assert_eq!(page.items[0].transaction_id.as_deref(), Some("txn1"));
        assert_eq!(page.items[1].transaction_id.as_deref(), Some("txn2"));

        let response = client
            .get("/voter/votes?page_num=2&page_size=2")
            .cookie(cookie)
            .dispatch()
            .await;

        let page: Paginated<VoteSummary> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].transaction_id.as_deref(), Some("txn3"));
    }
}
