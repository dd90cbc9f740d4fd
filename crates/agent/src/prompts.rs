//! Instruction and task text for the two model calls.
//!
//! The wording here is part of the routing behavior; keep it stable so
//! recorded fixtures stay reproducible.

use coupler_core::team::TeamRoster;

/// System instructions for the splitting stage.
pub const SPLIT_INSTRUCTIONS: &str = r#"You are a helpful assistant that collects user requests and stores them in a list.
You will be given a user's request and you will need to determine how many different requests the user has made.
Start by evaluating each phrase or set of words one at a time.
If the phrase is not similar to the previous phrase, consider this a new request.
You will then return a list of strings with each user request.

Here's an example.

The user has entered the following request:
"How do I get from Tacoma to Seattle, WA? I would like to know more about the history of Pie Eating.  How much is 2 + 2?"

The user has made three requests:
- "How do I get from Tacoma to Seattle, WA?
- I would like to know more about the history of Pie Eating.
- How much is 2 + 2?

The output should be:
{"user_requests": ["How do I get from Tacoma to Seattle, WA?", "I would like to know more about the history of Pie Eating.", "How much is 2 + 2?"]}
"#;

/// Task text for the splitting stage.
pub fn split_task(request: &str) -> String {
    format!("Collect a list of individual user requests from the following: {request}")
}

/// System instructions for the classification stage, with the roster embedded.
pub fn classify_instructions(roster: &TeamRoster) -> String {
    format!(
        r#"Your job is to look at a request made by a user and determine which team member should handle the request.
Each team member has a unique identifier and a description of what tasks the team member handles.
Review the list of team members and match the request to the team member using the description.
Determine a confidence score for your confidence selecting the team member which is a value from 0 to 1:
    - Values closer to 1 indicate a high confidence the match is correct
    - Values closer to zero indicate a low confidence
    - Return 0 if the request does not match any team member
You should return the team member id as team_member_id, the description of the team member as role, the confidence score as confidence, and the original user request as user_request.

For example, you have the following two team members:
MATH_TEAM_MEMBER - solves math problems
PHYSICS_TEAM_MEMBER - solves physics problems

If the user requests "add 2 and 2 together", the response would be the following because the MATH_TEAM_MEMBER handles math problems and confidence is high this is a math problem:
    {{"team_member_id": "MATH_TEAM_MEMBER", "role": "solves math problems", "user_request": "add 2 and 2 together", "confidence": 0.95}}

Here is the list of team members:

{}
"#,
        roster.describe_all()
    )
}

/// Task text for the classification stage.
pub fn classify_task(request: &str) -> String {
    format!("Determine which team member should handle the following user request: {request}")
}
