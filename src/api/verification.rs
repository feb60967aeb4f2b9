use rocket::{serde::json::Json, Route, State};

use crate::error::Result;
use crate::ledger::DynLedger;
use crate::model::{
    api::{auth::AuthToken, verify::VoteVerification, vote::VoteDetails},
    db::{admin::Admin, vote::AnyVote, voter::Voter},
    mongodb::{Coll, Id},
};
use crate::voting::verification::{verify_vote, vote_for_caller, Caller};

pub fn routes() -> Vec<Route> {
    routes![
        vote_details_admin,
        vote_details_voter,
        verify_vote_admin,
        verify_vote_voter,
    ]
}

/// Any vote's stored details, with provenance.
#[get("/votes/<vote_id>", rank = 1)]
async fn vote_details_admin(
    _token: AuthToken<Admin>,
    vote_id: Id,
    votes: Coll<AnyVote>,
) -> Result<Json<VoteDetails>> {
    let vote = vote_for_caller(vote_id, Caller::Admin, &votes).await?;
    Ok(Json(VoteDetails::from_vote(vote, true)))
}

/// A voter's view of their own vote. Other voters' votes do not exist as
/// far as this endpoint is concerned.
#[get("/votes/<vote_id>", rank = 2)]
async fn vote_details_voter(
    token: AuthToken<Voter>,
    vote_id: Id,
    votes: Coll<AnyVote>,
) -> Result<Json<VoteDetails>> {
    let vote = vote_for_caller(vote_id, Caller::Voter(token.id), &votes).await?;
    Ok(Json(VoteDetails::from_vote(vote, false)))
}

/// Check any vote against the ledger.
#[get("/votes/<vote_id>/verify", rank = 1)]
async fn verify_vote_admin(
    _token: AuthToken<Admin>,
    vote_id: Id,
    votes: Coll<AnyVote>,
    ledger: &State<DynLedger>,
) -> Result<Json<VoteVerification>> {
    let verification = verify_vote(vote_id, Caller::Admin, &votes, ledger.inner()).await?;
    Ok(Json(verification))
}

/// Check the caller's own vote against the ledger.
#[get("/votes/<vote_id>/verify", rank = 2)]
async fn verify_vote_voter(
    token: AuthToken<Voter>,
    vote_id: Id,
    votes: Coll<AnyVote>,
    ledger: &State<DynLedger>,
) -> Result<Json<VoteVerification>> {
    let verification = verify_vote(vote_id, Caller::Voter(token.id), &votes, ledger.inner()).await?;
    Ok(Json(verification))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{Cookie, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::config::Config;
    use crate::model::{
        api::{
            auth::User,
            receipt::VoteReceipt,
            verify::VoteIntegrity,
            vote::{SubmissionMeta, VoteSpec},
        },
        db::{candidate::Candidate, election::Election},
    };
    use crate::notify::DynNotifier;
    use crate::voting::submission::SubmissionPipeline;

    use super::*;

    /// A session cookie signed with the server's own secret.
    fn auth_cookie<U: User>(client: &Client, user: &U) -> Cookie<'static> {
        let config = client.rocket().state::<Config>().unwrap();
        AuthToken::new(user).into_cookie(config)
    }

    /// Cast a vote through the pipeline, so the endpoints have something
    /// real to look at.
    async fn cast_vote(client: &Client, db: &Database) -> (Voter, VoteReceipt) {
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

        let pipeline = SubmissionPipeline {
            voters: Coll::from_db(db),
            elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
            votes: Coll::from_db(db),
            pending_votes: Coll::from_db(db),
            confirmed_votes: Coll::from_db(db),
            ledger: client.rocket().state::<DynLedger>().unwrap().clone(),
            notifier: client.rocket().state::<DynNotifier>().unwrap().clone(),
        };
        let receipt = pipeline
            .submit_vote(
                voter.id,
                election.id,
                &VoteSpec {
                    candidate_id: candidate.id,
                },
                SubmissionMeta {
                    origin: Some("203.0.113.7".to_string()),
                    agent: Some("test-agent/1.0".to_string()),
                },
            )
            .await
            .unwrap();
        (voter, receipt)
    }

    #[backend_test]
    async fn admin_sees_details_and_provenance(client: Client, db: Database) {
        let (_, receipt) = cast_vote(&client, &db).await;
        let admin = Admin::example();
        Coll::<Admin>::from_db(&db)
            .insert_one(&admin, None)
            .await
            .unwrap();
        let cookie = auth_cookie(&client, &admin);

        let response = client
            .get(uri!(vote_details_admin(*receipt.vote_id)))
            .cookie(cookie.clone())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let details: VoteDetails =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(details.state, "Confirmed");
        assert_eq!(details.transaction_id.as_deref(), Some(&*receipt.transaction_id));
        let provenance = details.provenance.unwrap();
        assert_eq!(provenance.origin.as_deref(), Some("203.0.113.7"));

        let response = client
            .get(uri!(verify_vote_admin(*receipt.vote_id)))
            .cookie(cookie)
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let verification: VoteVerification =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(verification.integrity, VoteIntegrity::Verified);
        assert!(verification.ledger.exists);
        assert!(verification.provenance.is_some());
    }

    #[backend_test]
    async fn voter_sees_their_own_vote_without_provenance(client: Client, db: Database) {
        let (voter, receipt) = cast_vote(&client, &db).await;
        let cookie = auth_cookie(&client, &voter);

        let response = client
            .get(uri!(vote_details_voter(*receipt.vote_id)))
            .cookie(cookie.clone())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let details: VoteDetails =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(details.vote_id, receipt.vote_id);
        assert_eq!(details.provenance, None);

        let response = client
            .get(uri!(verify_vote_voter(*receipt.vote_id)))
            .cookie(cookie)
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let verification: VoteVerification =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(verification.integrity, VoteIntegrity::Verified);
        assert_eq!(verification.provenance, None);
    }

    #[backend_test]
    async fn a_strangers_vote_is_not_found(client: Client, db: Database) {
        let (_, receipt) = cast_vote(&client, &db).await;
        let stranger = Voter::example();
        Coll::<Voter>::from_db(&db)
            .insert_one(&stranger, None)
            .await
            .unwrap();
        let cookie = auth_cookie(&client, &stranger);

        let response = client
            .get(uri!(vote_details_voter(*receipt.vote_id)))
            .cookie(cookie.clone())
            .dispatch()
            .await;

        assert_eq!(Status::NotFound, response.status());
        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["error"], "not_found");

        let response = client
            .get(uri!(verify_vote_voter(*receipt.vote_id)))
            .cookie(cookie)
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn requires_a_session(client: Client, db: Database) {
        let (_, receipt) = cast_vote(&client, &db).await;

        let response = client
            .get(uri!(vote_details_voter(*receipt.vote_id)))
            .dispatch()
            .await;

        assert_eq!(Status::NotFound, response.status());
    }
}
