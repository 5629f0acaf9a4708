mod support;

use uuid::Uuid;

use innovest_api::ErrorKind;
use innovest_room::{Conversation, Inbox, InnovatorInbox, InterestDesk, InvestorInbox, inbox_for};
use innovest_types::models::{AccessRequest, AccessStatus, MandateInterestStatus, Role};

use support::FakeMarket;

fn request(deal_id: Uuid, investor_id: Uuid, intro_requested: bool) -> AccessRequest {
    AccessRequest {
        id: Uuid::new_v4(),
        deal_id,
        investor_id,
        status: AccessStatus::Approved,
        nda_signed: true,
        intro_requested,
        nda_signed_at: None,
        created_at: None,
    }
}

#[tokio::test]
async fn interest_can_be_expressed_once() {
    let market = FakeMarket::new(Vec::new());
    let desk = InterestDesk::new(&market);
    let mandate = Uuid::new_v4();

    assert!(!desk.has_interest(mandate).await.unwrap());
    desk.express_interest(mandate).await.unwrap();
    assert!(desk.has_interest(mandate).await.unwrap());

    let err = desk.express_interest(mandate).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.to_string(), "cannot express interest while INTERESTED");
    assert_eq!(desk.list_interests(mandate).await.unwrap().len(), 1);
}

#[tokio::test]
async fn interest_is_decided_exactly_once() {
    let market = FakeMarket::new(Vec::new());
    let desk = InterestDesk::new(&market);
    let mandate = Uuid::new_v4();
    let interest = market.add_interest(mandate, Uuid::new_v4());

    let contacted = desk.mark_contacted(&interest).await.unwrap();
    assert_eq!(contacted.status, MandateInterestStatus::Contacted);

    let err = desk.reject(&contacted).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(
        desk.list_interests(mandate).await.unwrap()[0].status,
        MandateInterestStatus::Contacted
    );
}

#[tokio::test]
async fn innovator_inbox_lists_investors_who_asked_for_an_intro() {
    let innovator = Uuid::new_v4();
    let deal = support::deal(innovator);
    let deal_id = deal.id;
    let market = FakeMarket::new(vec![deal, support::deal(Uuid::new_v4())]);
    let chatty = Uuid::new_v4();
    market.seed_request(request(deal_id, chatty, true));
    market.seed_request(request(deal_id, Uuid::new_v4(), false));

    let conversations = InnovatorInbox::new(&market, innovator)
        .conversations()
        .await
        .unwrap();
    assert_eq!(
        conversations,
        vec![Conversation {
            deal_id,
            title: "Solar Roofs".into(),
            counterpart_id: chatty,
        }]
    );
}

#[tokio::test]
async fn investor_inbox_talks_to_each_deal_innovator() {
    let innovator = Uuid::new_v4();
    let investor = Uuid::new_v4();
    let open = support::deal(innovator);
    let quiet = support::deal(innovator);
    let (open_id, quiet_id) = (open.id, quiet.id);
    let market = FakeMarket::new(vec![open, quiet]);
    market.seed_request(request(open_id, investor, true));
    market.seed_request(request(quiet_id, investor, false));
    // Intro on a deal that is no longer listed.
    market.seed_request(request(Uuid::new_v4(), investor, true));

    let conversations = InvestorInbox::new(&market, investor)
        .conversations()
        .await
        .unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].deal_id, open_id);
    assert_eq!(conversations[0].counterpart_id, innovator);
}

#[tokio::test]
async fn inbox_follows_the_role() {
    let market = FakeMarket::new(Vec::new());
    let user = Uuid::new_v4();
    assert!(inbox_for(&market, Role::Admin, user).is_none());

    let inbox = inbox_for(&market, Role::Investor, user).unwrap();
    assert!(inbox.conversations().await.unwrap().is_empty());

    market.set_offline(true);
    let err = inbox.conversations().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}
