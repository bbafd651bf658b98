//! OP-stack contract ABI definitions
//!
//! Uses alloy's sol! macro to generate call/return/event types. Calls are
//! encoded here and sent through a `ChainEndpoint`, so no `#[sol(rpc)]`
//! instances are generated.
//!
//! ## Contracts
//! - L1: `L1StandardBridge`, `L1CrossDomainMessenger`, `OptimismPortal`, `L2OutputOracle`
//! - L2: `L2StandardBridge`, `L2CrossDomainMessenger`, `L2ToL1MessagePasser`

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Withdrawal as hashed and proven by the portal
    #[derive(Debug, PartialEq, Eq)]
    struct WithdrawalTransaction {
        uint256 nonce;
        address sender;
        address target;
        uint256 value;
        uint256 gasLimit;
        bytes data;
    }

    /// Preimage of an L2 output root (version 0)
    #[derive(Debug, PartialEq, Eq)]
    struct OutputRootProof {
        bytes32 version;
        bytes32 stateRoot;
        bytes32 messagePasserStorageRoot;
        bytes32 latestBlockhash;
    }

    /// Output proposal stored by the `L2OutputOracle`
    #[derive(Debug, PartialEq, Eq)]
    struct OutputProposal {
        bytes32 outputRoot;
        uint128 timestamp;
        uint128 l2BlockNumber;
    }

    // ========================================================================
    // L1
    // ========================================================================

    interface L1StandardBridge {
        /// Deposit ether to `_to` on L2
        function depositETHTo(address _to, uint32 _minGasLimit, bytes _extraData) external payable;

        /// Deposit an ERC-20 to `_to` on L2 (requires allowance)
        function depositERC20To(
            address _l1Token,
            address _l2Token,
            address _to,
            uint256 _amount,
            uint32 _minGasLimit,
            bytes _extraData
        ) external;
    }

    interface L1CrossDomainMessenger {
        event SentMessage(
            address indexed target,
            address sender,
            bytes message,
            uint256 messageNonce,
            uint256 gasLimit
        );

        event SentMessageExtension1(address indexed sender, uint256 value);
    }

    interface OptimismPortal {
        function proveWithdrawalTransaction(
            WithdrawalTransaction _tx,
            uint256 _l2OutputIndex,
            OutputRootProof _outputRootProof,
            bytes[] _withdrawalProof
        ) external;

        function finalizeWithdrawalTransaction(WithdrawalTransaction _tx) external;

        function provenWithdrawals(bytes32 withdrawalHash) external view returns (
            bytes32 outputRoot,
            uint128 timestamp,
            uint128 l2OutputIndex
        );

        function finalizedWithdrawals(bytes32 withdrawalHash) external view returns (bool);
    }

    interface L2OutputOracle {
        function latestBlockNumber() external view returns (uint256);

        function getL2OutputIndexAfter(uint256 _l2BlockNumber) external view returns (uint256);

        function getL2Output(uint256 _l2OutputIndex) external view returns (OutputProposal);

        function FINALIZATION_PERIOD_SECONDS() external view returns (uint256);
    }

    // ========================================================================
    // L2
    // ========================================================================

    interface L2StandardBridge {
        /// Withdraw `_l2Token` (legacy ETH token address for ether) to `_to` on L1
        function withdrawTo(
            address _l2Token,
            address _to,
            uint256 _amount,
            uint32 _minGasLimit,
            bytes _extraData
        ) external payable;
    }

    interface L2CrossDomainMessenger {
        function successfulMessages(bytes32 msgHash) external view returns (bool);

        function failedMessages(bytes32 msgHash) external view returns (bool);

        /// Version 1 relay entry point; its calldata is the message hash preimage
        function relayMessage(
            uint256 _nonce,
            address _sender,
            address _target,
            uint256 _value,
            uint256 _minGasLimit,
            bytes _message
        ) external payable;
    }

    /// Pre-Bedrock relay signature, hashed for version 0 nonces
    interface LegacyCrossDomainMessenger {
        function relayMessage(
            address _target,
            address _sender,
            bytes _message,
            uint256 _messageNonce
        ) external;
    }

    interface L2ToL1MessagePasser {
        event MessagePassed(
            uint256 indexed nonce,
            address indexed sender,
            address indexed target,
            uint256 value,
            uint256 gasLimit,
            bytes data,
            bytes32 withdrawalHash
        );
    }

    interface ERC20 {
        function approve(address spender, uint256 amount) external returns (bool);

        function allowance(address owner, address spender) external view returns (uint256);

        function balanceOf(address account) external view returns (uint256);
    }
}
