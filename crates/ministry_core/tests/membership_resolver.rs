use ministry_core::db::open_db_in_memory;
use ministry_core::directory::{DirectoryResult, MemberRecord};
use ministry_core::{
    CreateMinistryRequest, FallbackDirectory, MemberAssignment, MemberDirectory, MemberId,
    MemberSearchFilters, MinistryId, MinistryService, RoleName, RoleRanking,
};
use rusqlite::Connection;
use std::collections::BTreeSet;

struct EmptyDirectory;

impl MemberDirectory for EmptyDirectory {
    fn search_members(&self, _: &MemberSearchFilters) -> DirectoryResult<Vec<MemberRecord>> {
        Ok(Vec::new())
    }

    fn members_by_ids(&self, _: &BTreeSet<MemberId>) -> DirectoryResult<Vec<MemberRecord>> {
        Ok(Vec::new())
    }
}

fn service_with(conn: &Connection, ranking: RoleRanking) -> MinistryService<'_, EmptyDirectory> {
    MinistryService::try_new(conn, FallbackDirectory::new(EmptyDirectory), ranking).unwrap()
}

fn seat(member_id: &str, role: RoleName, committee: bool) -> MemberAssignment {
    MemberAssignment {
        member_id: member_id.to_string(),
        role: Some(role),
        committee,
    }
}

fn create(
    service: &MinistryService<'_, EmptyDirectory>,
    name: &str,
    parent_id: Option<MinistryId>,
    members: Vec<MemberAssignment>,
) -> MinistryId {
    service
        .create_ministry(CreateMinistryRequest {
            name: name.to_string(),
            parent_id,
            members,
            ..CreateMinistryRequest::default()
        })
        .unwrap()
        .id
}

#[test]
fn lower_rank_wins_between_equally_shallow_ministries() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, RoleRanking::standard().clone());

    create(&service, "Finance", None, vec![seat("m-1", RoleName::Secretary, false)]);
    let board = create(&service, "Board", None, vec![seat("m-1", RoleName::Chairman, false)]);

    let resolved = service.highest_role_for_member("m-1").unwrap().unwrap();
    assert_eq!(resolved.role, RoleName::Chairman);
    assert_eq!(resolved.ministry_id, board);
    assert_eq!(resolved.ministry_name.as_deref(), Some("Board"));
}

#[test]
fn committee_seats_are_preferred_over_better_ranked_unit_seats() {
    let conn = open_db_in_memory().unwrap();
    let ranking = RoleRanking::from_entries([(RoleName::Teacher, 50), (RoleName::LeadPastor, 5)]);
    let service = service_with(&conn, ranking);

    let school = create(&service, "Sunday School", None, vec![seat("m-2", RoleName::Teacher, true)]);
    create(&service, "Pastorate", None, vec![seat("m-2", RoleName::LeadPastor, false)]);

    let resolved = service.highest_role_for_member("m-2").unwrap().unwrap();
    assert_eq!(resolved.role, RoleName::Teacher);
    assert_eq!(resolved.ministry_id, school);
}

#[test]
fn shallower_ministry_beats_more_senior_role_deeper_down() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, RoleRanking::standard().clone());

    let church = create(&service, "Church", None, vec![seat("m-3", RoleName::Usher, false)]);
    create(
        &service,
        "Pastoral Team",
        Some(church),
        vec![seat("m-3", RoleName::SeniorPastor, false)],
    );

    let resolved = service.highest_role_for_member("m-3").unwrap().unwrap();
    assert_eq!(resolved.ministry_id, church);
    assert_eq!(resolved.role, RoleName::Usher);
}

#[test]
fn member_without_active_seats_resolves_to_none() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, RoleRanking::standard().clone());
    create(&service, "Choir", None, vec![seat("m-4", RoleName::Member, false)]);

    assert!(service.highest_role_for_member("nobody").unwrap().is_none());

    conn.execute(
        "UPDATE ministry_members SET active = 0 WHERE member_id = 'm-4';",
        [],
    )
    .unwrap();
    assert!(service.highest_role_for_member("m-4").unwrap().is_none());
}

#[test]
fn config_override_changes_the_winner() {
    let conn = open_db_in_memory().unwrap();
    let ranking = RoleRanking::standard().with_overrides([(RoleName::Secretary, 1)]);
    let service = service_with(&conn, ranking);

    let office = create(&service, "Office", None, vec![seat("m-5", RoleName::Secretary, false)]);
    create(&service, "Board", None, vec![seat("m-5", RoleName::Chairman, false)]);

    let resolved = service.highest_role_for_member("m-5").unwrap().unwrap();
    assert_eq!(resolved.ministry_id, office);
}
